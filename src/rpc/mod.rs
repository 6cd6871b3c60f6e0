//! gRPC transport (SPEC_FULL.md §6, ambient component T1): a tonic-generated service
//! trait implementing Add/Modify/Remove/Get*/Check for each entity kind, mapping
//! [`GateError`](crate::error::GateError) to `tonic::Status` the same way clarium's
//! `error.rs` keeps one table per boundary (HTTP, pgwire) instead of scattering status
//! mapping across handlers.
//!
//! Grounded on `entity-gateway`'s `build.rs`/service-trait shape: one `tonic::Request`
//! in, one `tonic::Response` out, per RPC, with the actual logic delegated to
//! [`crate::admin::GateService`].

mod convert;

pub mod proto {
    tonic::include_proto!("gatehouse");
}

use crate::admin::GateService;
use crate::enrich::CheckRequest;
use crate::registry::actor::{ActorAttrEdit, ActorFilter};
use crate::registry::group::{GroupEdit, GroupFilter};
use crate::registry::role::{RoleEdit, RoleFilter};
use crate::registry::policy::PolicyFilter;
use crate::registry::target::{TargetAttrEdit, TargetFilter};
use proto::gatehouse_server::Gatehouse;
use tonic::{Request, Response, Status};

pub use proto::gatehouse_server::GatehouseServer;

/// Wraps [`GateService`] behind the generated `Gatehouse` service trait.
pub struct GatehouseRpc {
    service: GateService,
}

impl GatehouseRpc {
    pub fn new(service: GateService) -> Self {
        Self { service }
    }
}

fn attrs_from_wire_pairs(
    wire: std::collections::HashMap<String, proto::StringList>,
) -> Vec<(String, Vec<String>)> {
    wire.into_iter().map(|(k, v)| (k, v.values)).collect()
}

#[tonic::async_trait]
impl Gatehouse for GatehouseRpc {
    async fn check(&self, request: Request<proto::CheckRequest>) -> Result<Response<proto::CheckResponse>, Status> {
        let req = request.into_inner();
        let check_req = CheckRequest {
            actor_name: req.actor_name,
            actor_type: req.actor_type,
            actor_attributes: convert::attr_map_from_wire(req.actor_attributes),
            env_attributes: convert::attr_map_from_wire(req.env_attributes),
            target_name: req.target_name,
            target_type: req.target_type,
            target_action: req.target_action,
        };
        GateService::validate_check_request(&check_req)?;
        let decision = self.service.check(&check_req);
        Ok(Response::new(proto::CheckResponse { decision: match decision {
            crate::registry::model::Decision::Allow => proto::Decision::Allow as i32,
            crate::registry::model::Decision::Deny => proto::Decision::Deny as i32,
        }}))
    }

    async fn add_target(&self, request: Request<proto::AddTargetRequest>) -> Result<Response<proto::AddTargetResponse>, Status> {
        let req = request.into_inner();
        convert::require_non_empty("name", &req.name)?;
        convert::require_non_empty("type", &req.r#type)?;
        let target = self.service.add_target(&req.name, &req.r#type).await?;
        Ok(Response::new(proto::AddTargetResponse { target: Some(convert::target_to_wire(&target)) }))
    }

    async fn modify_target(&self, request: Request<proto::ModifyTargetRequest>) -> Result<Response<proto::ModifyTargetResponse>, Status> {
        let req = request.into_inner();
        let edit = TargetAttrEdit {
            add_actions: req.add_actions,
            remove_actions: req.remove_actions,
            add_attributes: attrs_from_wire_pairs(req.add_attributes),
            remove_attributes: attrs_from_wire_pairs(req.remove_attributes),
        };
        let target = self.service.modify_target(&req.name, &req.r#type, edit).await?;
        Ok(Response::new(proto::ModifyTargetResponse { target: Some(convert::target_to_wire(&target)) }))
    }

    async fn remove_target(&self, request: Request<proto::RemoveTargetRequest>) -> Result<Response<proto::RemoveTargetResponse>, Status> {
        let req = request.into_inner();
        self.service.remove_target(&req.name, &req.r#type).await?;
        Ok(Response::new(proto::RemoveTargetResponse {}))
    }

    async fn get_targets(&self, request: Request<proto::GetTargetsRequest>) -> Result<Response<proto::GetTargetsResponse>, Status> {
        let req = request.into_inner();
        let filter = TargetFilter { name: req.name, type_: req.r#type };
        let targets = self.service.get_targets(&filter).iter().map(convert::target_to_wire).collect();
        Ok(Response::new(proto::GetTargetsResponse { targets }))
    }

    async fn add_actor(&self, request: Request<proto::AddActorRequest>) -> Result<Response<proto::AddActorResponse>, Status> {
        let req = request.into_inner();
        convert::require_non_empty("name", &req.name)?;
        convert::require_non_empty("type", &req.r#type)?;
        let actor = self.service.add_actor(&req.name, &req.r#type).await?;
        Ok(Response::new(proto::AddActorResponse { actor: Some(convert::actor_to_wire(&actor)) }))
    }

    async fn modify_actor(&self, request: Request<proto::ModifyActorRequest>) -> Result<Response<proto::ModifyActorResponse>, Status> {
        let req = request.into_inner();
        let edit = ActorAttrEdit {
            add_attributes: attrs_from_wire_pairs(req.add_attributes),
            remove_attributes: attrs_from_wire_pairs(req.remove_attributes),
        };
        let actor = self.service.modify_actor(&req.name, &req.r#type, edit).await?;
        Ok(Response::new(proto::ModifyActorResponse { actor: Some(convert::actor_to_wire(&actor)) }))
    }

    async fn remove_actor(&self, request: Request<proto::RemoveActorRequest>) -> Result<Response<proto::RemoveActorResponse>, Status> {
        let req = request.into_inner();
        self.service.remove_actor(&req.name, &req.r#type).await?;
        Ok(Response::new(proto::RemoveActorResponse {}))
    }

    async fn get_actors(&self, request: Request<proto::GetActorsRequest>) -> Result<Response<proto::GetActorsResponse>, Status> {
        let req = request.into_inner();
        let filter = ActorFilter { name: req.name, type_: req.r#type };
        let actors = self.service.get_actors(&filter).iter().map(convert::actor_to_wire).collect();
        Ok(Response::new(proto::GetActorsResponse { actors }))
    }

    async fn add_group(&self, request: Request<proto::AddGroupRequest>) -> Result<Response<proto::AddGroupResponse>, Status> {
        let req = request.into_inner();
        convert::require_non_empty("name", &req.name)?;
        let group = self.service.add_group(&req.name, req.description).await?;
        Ok(Response::new(proto::AddGroupResponse { group: Some(convert::group_to_wire(&group)) }))
    }

    async fn modify_group(&self, request: Request<proto::ModifyGroupRequest>) -> Result<Response<proto::ModifyGroupResponse>, Status> {
        let req = request.into_inner();
        let edit = GroupEdit {
            add_members: req.add_members.into_iter().map(|m| (m.name, m.r#type)).collect(),
            remove_members: req.remove_members.into_iter().map(|m| (m.name, m.r#type)).collect(),
            add_roles: req.add_roles,
            remove_roles: req.remove_roles,
            description: req.description,
        };
        let group = self.service.modify_group(&req.name, edit).await?;
        Ok(Response::new(proto::ModifyGroupResponse { group: Some(convert::group_to_wire(&group)) }))
    }

    async fn remove_group(&self, request: Request<proto::RemoveGroupRequest>) -> Result<Response<proto::RemoveGroupResponse>, Status> {
        let req = request.into_inner();
        self.service.remove_group(&req.name).await?;
        Ok(Response::new(proto::RemoveGroupResponse {}))
    }

    async fn get_groups(&self, request: Request<proto::GetGroupsRequest>) -> Result<Response<proto::GetGroupsResponse>, Status> {
        let req = request.into_inner();
        let filter = GroupFilter {
            name: req.name,
            member: req.member.map(|m| (m.name, m.r#type)),
            role_name: req.role_name,
        };
        let groups = self.service.get_groups(&filter).iter().map(convert::group_to_wire).collect();
        Ok(Response::new(proto::GetGroupsResponse { groups }))
    }

    async fn add_role(&self, request: Request<proto::AddRoleRequest>) -> Result<Response<proto::AddRoleResponse>, Status> {
        let req = request.into_inner();
        convert::require_non_empty("name", &req.name)?;
        let role = self.service.add_role(&req.name, req.description).await?;
        Ok(Response::new(proto::AddRoleResponse { role: Some(convert::role_to_wire(&role)) }))
    }

    async fn modify_role(&self, request: Request<proto::ModifyRoleRequest>) -> Result<Response<proto::ModifyRoleResponse>, Status> {
        let req = request.into_inner();
        let edit = RoleEdit { add_groups: req.add_groups, remove_groups: req.remove_groups, description: req.description };
        let role = self.service.modify_role(&req.name, edit).await?;
        Ok(Response::new(proto::ModifyRoleResponse { role: Some(convert::role_to_wire(&role)) }))
    }

    async fn remove_role(&self, request: Request<proto::RemoveRoleRequest>) -> Result<Response<proto::RemoveRoleResponse>, Status> {
        let req = request.into_inner();
        self.service.remove_role(&req.name).await?;
        Ok(Response::new(proto::RemoveRoleResponse {}))
    }

    async fn get_roles(&self, request: Request<proto::GetRolesRequest>) -> Result<Response<proto::GetRolesResponse>, Status> {
        let req = request.into_inner();
        let filter = RoleFilter { name: req.name, group_name: req.group_name };
        let roles = self.service.get_roles(&filter).iter().map(convert::role_to_wire).collect();
        Ok(Response::new(proto::GetRolesResponse { roles }))
    }

    async fn add_policy(&self, request: Request<proto::AddPolicyRequest>) -> Result<Response<proto::AddPolicyResponse>, Status> {
        let req = request.into_inner();
        let rule = req.policy.ok_or_else(|| Status::invalid_argument("policy is required"))?;
        let rule = convert::policy_from_wire(rule)?;
        let stored = self.service.add_policy(rule).await?;
        Ok(Response::new(proto::AddPolicyResponse { policy: Some(convert::policy_to_wire(&stored)) }))
    }

    async fn modify_policy(&self, request: Request<proto::ModifyPolicyRequest>) -> Result<Response<proto::ModifyPolicyResponse>, Status> {
        let req = request.into_inner();
        let rule = req.policy.ok_or_else(|| Status::invalid_argument("policy is required"))?;
        let rule = convert::policy_from_wire(rule)?;
        let stored = self.service.modify_policy(&req.name, rule).await?;
        Ok(Response::new(proto::ModifyPolicyResponse { policy: Some(convert::policy_to_wire(&stored)) }))
    }

    async fn remove_policy(&self, request: Request<proto::RemovePolicyRequest>) -> Result<Response<proto::RemovePolicyResponse>, Status> {
        let req = request.into_inner();
        self.service.remove_policy(&req.name).await?;
        Ok(Response::new(proto::RemovePolicyResponse {}))
    }

    async fn get_policies(&self, request: Request<proto::GetPoliciesRequest>) -> Result<Response<proto::GetPoliciesResponse>, Status> {
        let req = request.into_inner();
        let filter = PolicyFilter { name: req.name, decision: None };
        let policies = self.service.get_policies(&filter).iter().map(convert::policy_to_wire).collect();
        Ok(Response::new(proto::GetPoliciesResponse { policies }))
    }
}
