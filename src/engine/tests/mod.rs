use std::sync::Arc;

use super::*;
use crate::ast::Expr;
use crate::error::EvalErrorKind;
use crate::snapshot_json;
use crate::types::{
    Context, Entities, EntitiesBuilder, EntityType, IpAddr, Record, ScopeConstraint, Value,
};
use yare::parameterized;


const PHOTO: &str = "VacationPhoto94.jpg";

fn uid(ty: &str, id: &str) -> EntityUid {
    EntityUid::new(ty, id)
}

fn user(id: &str) -> EntityUid {
    uid("User", id)
}

fn action(id: &str) -> EntityUid {
    uid("Action", id)
}

fn photo(id: &str) -> EntityUid {
    uid("Photo", id)
}

fn host(name: &str) -> EntityUid {
    uid("Host", name)
}

fn eq(entity: EntityUid) -> ScopeConstraint {
    ScopeConstraint::Eq { entity }
}

fn in_(entity: EntityUid) -> ScopeConstraint {
    ScopeConstraint::In { entity }
}

fn in_set(entities: &[EntityUid]) -> ScopeConstraint {
    ScopeConstraint::InSet {
        entities: entities.to_vec(),
    }
}

fn is(entity_type: &str) -> ScopeConstraint {
    ScopeConstraint::Is {
        entity_type: EntityType::new(entity_type),
    }
}

fn policy_set(policies: impl IntoIterator<Item = Policy>) -> PolicySet {
    PolicySet::from_policies(policies).expect("policy ids should be unique")
}

/// alice may view, edit and delete the vacation photo; bob may only view it.
fn photo_policies() -> PolicySet {
    policy_set([
        Policy::permit("alice-photo")
            .with_principal(eq(user("alice")))
            .with_action(in_set(&[action("view"), action("edit"), action("delete")]))
            .with_resource(eq(photo(PHOTO))),
        Policy::permit("bob-photo")
            .with_principal(eq(user("bob")))
            .with_action(eq(action("view")))
            .with_resource(eq(photo(PHOTO))),
    ])
}

/// Same as [`photo_policies`], plus forbids that override alice's permit.
fn forbid_policies() -> PolicySet {
    let mut set = photo_policies();
    set.add(
        Policy::forbid("alice-no-edit")
            .with_principal(eq(user("alice")))
            .with_action(eq(action("edit")))
            .with_resource(eq(photo(PHOTO))),
    )
    .unwrap();
    set.add(
        Policy::forbid("nobody-deletes")
            .with_action(eq(action("delete")))
            .with_resource(eq(photo(PHOTO))),
    )
    .unwrap();
    set
}

/// Host creation gated on the host's name and address.
fn host_policies() -> PolicySet {
    let name = || Expr::get_attr(Expr::resource(), "name");
    let ip = || Expr::get_attr(Expr::resource(), "ip");
    policy_set([
        Policy::permit("alice-web-hosts")
            .with_principal(eq(user("alice")))
            .with_action(eq(action("create_host")))
            .with_resource(is("Host"))
            .when(Expr::and(
                Expr::like(name(), "web*"),
                Expr::call_extension_fn("isInRange", [ip(), Expr::ip("192.0.1.0/24")]),
            )),
        Policy::permit("bob-hosts")
            .with_principal(eq(user("bob")))
            .with_action(eq(action("create_host")))
            .with_resource(is("Host"))
            .when(Expr::and(
                Expr::like(name(), "bob*"),
                Expr::call_extension_fn("isInRange", [ip(), Expr::ip("192.0.0.0/24")]),
            )),
    ])
}

/// Group and role based access.
fn group_policies() -> PolicySet {
    policy_set([
        Policy::permit("admins")
            .with_principal(in_(uid("Role", "admin")))
            .with_action(in_set(&[action("delete"), action("view")]))
            .with_resource(is("Photo")),
        Policy::permit("users")
            .with_principal(in_(uid("Group", "users")))
            .with_action(eq(action("view")))
            .with_resource(is("Photo")),
    ])
}

fn host_entity(builder: EntitiesBuilder, name: &str, ip: &str) -> EntitiesBuilder {
    let ip: IpAddr = ip.parse().expect("test ip should parse");
    builder.add_entity(
        host(name),
        Record::new().with_attr("name", name).with_attr("ip", ip),
        [],
    )
}

fn entities() -> Entities {
    let builder = Entities::builder()
        .add_uid(user("alice"))
        .add_uid(user("bob"))
        .add_entity(
            user("johnny"),
            Record::new().with_attr("clearance", 3_i64),
            [uid("Group", "devs")],
        )
        .add_entity(user("carol"), Record::new(), [uid("Group", "users")])
        .add_entity(uid("Group", "devs"), Record::new(), [uid("Role", "admin")])
        .add_uid(uid("Group", "users"))
        .add_uid(uid("Role", "admin"))
        .add_entity(
            photo(PHOTO),
            Record::new()
                .with_attr("owner", user("alice"))
                .with_attr("private", true),
            [uid("Album", "vacation")],
        );
    let builder = host_entity(builder, "web-01.example.com", "192.0.1.1");
    let builder = host_entity(builder, "web-99.example.com", "192.0.2.1");
    let builder = host_entity(builder, "abc.example.com", "192.0.1.2");
    let builder = host_entity(builder, "bob-01.example.com", "192.0.0.1");
    builder.build()
}

fn request(principal: EntityUid, action: EntityUid, resource: EntityUid) -> Request {
    Request::new(principal, action, resource, Context::new())
}

fn user_request(user_id: &str, action_id: &str, resource: EntityUid) -> Request {
    request(user(user_id), action(action_id), resource)
}

fn engine_from(policies: PolicySet) -> PolicyEngine {
    PolicyEngine::new(policies)
}

fn reasons(response: &Response) -> Vec<&str> {
    response
        .diagnostics
        .reasons
        .iter()
        .map(PolicyId::as_str)
        .collect()
}

fn assert_allow(response: &Response) {
    assert_eq!(response.decision, Decision::Allow, "{response}");
}

fn assert_deny(response: &Response) {
    assert_eq!(response.decision, Decision::Deny, "{response}");
}

include!("core.rs");
include!("evaluate.rs");
include!("listing.rs");
