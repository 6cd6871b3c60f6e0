fn main() -> Result<(), Box<dyn std::error::Error>> {
    // protoc isn't assumed to be preinstalled on the build host; vendor one instead of
    // requiring `PROTOC` to already point at a working binary (entity-gateway's
    // build.rs assumes the latter, which doesn't hold everywhere this crate builds).
    std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&["proto/gatehouse.proto"], &["proto"])?;

    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .compile_protos(&["proto/etcd.proto"], &["proto"])?;

    Ok(())
}
