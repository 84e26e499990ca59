#![allow(dead_code)]

use canopy_core::ast::Expr;
use canopy_core::types::{Record, ScopeConstraint};
use canopy_core::{
    Context, Entities, EntityType, EntityUid, Policy, PolicyEngine, PolicySet, Request,
};

#[derive(Debug, Clone, Copy)]
pub struct ScenarioSpec {
    pub name: &'static str,
    pub noise_policies: usize,
    pub groups: usize,
    pub conditions: usize,
    pub deny: bool,
    pub namespace_depth: usize,
}

pub struct Scenario {
    pub name: &'static str,
    pub engine: PolicyEngine,
    pub entities: Entities,
    pub request: Request,
}

fn namespaced(segments: &[String], type_name: &str) -> EntityType {
    if segments.is_empty() {
        EntityType::new(type_name)
    } else {
        EntityType::new(format!("{}::{type_name}", segments.join("::")))
    }
}

fn build_policies(spec: ScenarioSpec, namespace: &[String]) -> PolicySet {
    let uid = |ty: &str, id: &str| EntityUid::new(namespaced(namespace, ty), id);
    let host_is = || ScopeConstraint::Is {
        entity_type: EntityType::new("Host"),
    };
    let view_host = ScopeConstraint::Eq {
        entity: uid("Action", "view_host"),
    };

    let mut policies = Vec::new();

    // Stable match path for the allow scenarios.
    let mut primary = Policy::permit("target-views-hosts")
        .with_principal(ScopeConstraint::Eq {
            entity: uid("User", "target"),
        })
        .with_action(view_host.clone())
        .with_resource(host_is());
    for idx in 0..spec.conditions {
        let condition = match idx % 3 {
            0 => Expr::like(Expr::get_attr(Expr::resource(), "name"), "web-*"),
            1 => Expr::call_extension_fn(
                "isInRange",
                [
                    Expr::get_attr(Expr::resource(), "ip"),
                    Expr::ip("10.0.0.0/8"),
                ],
            ),
            _ => Expr::is_eq(Expr::get_attr(Expr::resource(), "env"), Expr::val("prod")),
        };
        primary = primary.when(condition);
    }
    policies.push(primary);

    // Forces ancestor lookups when groups are part of the scenario.
    if spec.groups > 0 {
        policies.push(
            Policy::permit("group-views-hosts")
                .with_principal(ScopeConstraint::In {
                    entity: uid("Group", "group_0"),
                })
                .with_action(view_host)
                .with_resource(host_is()),
        );
    }

    // Non-matching noise to stress the policy scan.
    for idx in 0..spec.noise_policies {
        policies.push(
            Policy::permit(format!("noise-{idx}"))
                .with_principal(ScopeConstraint::Eq {
                    entity: uid("User", &format!("noise_user_{idx}")),
                })
                .with_action(ScopeConstraint::Eq {
                    entity: uid("Action", &format!("noise_action_{idx}")),
                })
                .with_resource(host_is()),
        );
    }

    PolicySet::from_policies(policies).expect("benchmark policy ids are unique")
}

fn build_entities(spec: ScenarioSpec, namespace: &[String]) -> Entities {
    let uid = |ty: &str, id: &str| EntityUid::new(namespaced(namespace, ty), id);
    let groups: Vec<EntityUid> = (0..spec.groups)
        .map(|idx| uid("Group", &format!("group_{idx}")))
        .collect();

    let host_attrs = Record::new()
        .with_attr("name", "web-01.example.com")
        .with_attr(
            "ip",
            "10.0.0.42"
                .parse::<canopy_core::types::IpAddr>()
                .expect("benchmark ip must parse"),
        )
        .with_attr("env", "prod");

    Entities::builder()
        .add_entity(uid("User", "target"), Record::new(), groups)
        .add_entity(
            EntityUid::new("Host", "web-01.example.com"),
            host_attrs,
            [],
        )
        .build()
}

pub fn build_scenario(spec: ScenarioSpec) -> Scenario {
    let namespace: Vec<String> = (0..spec.namespace_depth)
        .map(|idx| format!("Ns{idx}"))
        .collect();
    let uid = |ty: &str, id: &str| EntityUid::new(namespaced(&namespace, ty), id);

    let action_name = if spec.deny {
        "delete_host"
    } else {
        "view_host"
    };

    let request = Request::new(
        uid("User", "target"),
        uid("Action", action_name),
        EntityUid::new("Host", "web-01.example.com"),
        Context::new(),
    );

    Scenario {
        name: spec.name,
        engine: PolicyEngine::new(build_policies(spec, &namespace)),
        entities: build_entities(spec, &namespace),
        request,
    }
}

pub fn baseline_specs() -> Vec<ScenarioSpec> {
    vec![
        ScenarioSpec {
            name: "s_small_allow",
            noise_policies: 8,
            groups: 0,
            conditions: 0,
            deny: false,
            namespace_depth: 0,
        },
        ScenarioSpec {
            name: "s_small_deny",
            noise_policies: 8,
            groups: 0,
            conditions: 0,
            deny: true,
            namespace_depth: 0,
        },
        ScenarioSpec {
            name: "m_medium_allow",
            noise_policies: 80,
            groups: 0,
            conditions: 0,
            deny: false,
            namespace_depth: 0,
        },
        ScenarioSpec {
            name: "l_large_allow",
            noise_policies: 400,
            groups: 0,
            conditions: 0,
            deny: false,
            namespace_depth: 0,
        },
        ScenarioSpec {
            name: "m_conditions_3",
            noise_policies: 80,
            groups: 0,
            conditions: 3,
            deny: false,
            namespace_depth: 0,
        },
        ScenarioSpec {
            name: "m_conditions_12",
            noise_policies: 80,
            groups: 0,
            conditions: 12,
            deny: false,
            namespace_depth: 0,
        },
        ScenarioSpec {
            name: "m_namespaced_depth_4_deny",
            noise_policies: 80,
            groups: 10,
            conditions: 3,
            deny: true,
            namespace_depth: 4,
        },
    ]
}

pub fn group_specs() -> Vec<ScenarioSpec> {
    [1, 10, 40, 200]
        .into_iter()
        .zip(["m_groups_1", "m_groups_10", "m_groups_40", "m_groups_200"])
        .map(|(groups, name)| ScenarioSpec {
            name,
            noise_policies: 80,
            groups,
            conditions: 0,
            deny: false,
            namespace_depth: 0,
        })
        .collect()
}
