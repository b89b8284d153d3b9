//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use sched_store::api::RedbApiServer;
use sched_store::tree::RedbTree;
use sched_store::*;

/// Route store logs to the test harness; later calls are no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("sched_store=debug"))
        .with_test_writer()
        .try_init();
}

pub fn tree_store() -> (RedbTree, Store) {
    init_logging();
    let tree = RedbTree::open_in_memory().unwrap();
    let store = Store::tree(Arc::new(tree.clone()), &TreeConfig::default());
    (tree, store)
}

pub fn api_store() -> (RedbApiServer, Store) {
    init_logging();
    let server = RedbApiServer::open_in_memory().unwrap();
    let store = Store::api(Arc::new(server.clone()), &ApiConfig::default());
    (server, store)
}

pub fn labels(pairs: &[(&str, &str)]) -> Labels {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn application(ns: &str, id: &str) -> Application {
    Application {
        id: id.to_string(),
        name: id.to_string(),
        run_as: ns.to_string(),
        cluster_id: "c1".to_string(),
        kind: "APP".to_string(),
        define_instances: 2,
        instances: 2,
        running_instances: 2,
        status: AppStatus::Running,
        last_status: AppStatus::Deploying,
        sub_status: String::new(),
        message: "running".to_string(),
        created: 1_700_000_000,
        update_time: 1_700_000_100,
        labels: labels(&[("team", "infra")]),
        pods: vec![format!("0.{id}.{ns}.c1.100")],
    }
}

pub fn version(ns: &str, app: &str, no: &str) -> Version {
    Version {
        id: app.to_string(),
        version_no: no.to_string(),
        run_as: ns.to_string(),
        name: app.to_string(),
        instances: 2,
        containers: vec![container()],
        labels: labels(&[("release", "stable")]),
        restart_policy: Some(RestartPolicy {
            policy: "OnFailure".to_string(),
            interval_secs: 5,
            backoff: 2,
            max_times: 10,
        }),
        kill_policy: Some(KillPolicy {
            grace_period_secs: 30,
        }),
        constraints: vec!["hostname UNIQUE".to_string()],
        raw_json: "{\"kind\":\"application\"}".to_string(),
    }
}

pub fn container() -> Container {
    Container {
        image: "registry.local/web:1.0".to_string(),
        command: "/bin/web".to_string(),
        args: vec!["--port".to_string(), "8080".to_string()],
        env: HashMap::from([("MODE".to_string(), "prod".to_string())]),
        resources: Resource {
            cpus: 0.5,
            mem: 256.0,
            disk: 1024.0,
        },
        ports: vec![PortMapping {
            name: "http".to_string(),
            container_port: 8080,
            host_port: -1,
            protocol: "tcp".to_string(),
        }],
    }
}

/// Task `index` of the group `{instance}.{app}.{ns}.c1.{created}`.
pub fn task(ns: &str, app: &str, instance: u64, created: u64, index: u64) -> Task {
    Task {
        id: format!("{created}.{index}.{instance}.{app}.{ns}.c1"),
        name: format!("{app}-{index}"),
        app_id: app.to_string(),
        run_as: ns.to_string(),
        hostname: "node-1".to_string(),
        agent_ip: "10.0.0.1".to_string(),
        container: container(),
        status: TaskStatus::Running,
        last_status: TaskStatus::Starting,
        status_data: "{}".to_string(),
        healthy: true,
        updated: 1_700_000_100,
        message: String::new(),
    }
}

pub fn task_group(ns: &str, app: &str, instance: u64, created: u64, tasks: u64) -> TaskGroup {
    TaskGroup {
        id: format!("{instance}.{app}.{ns}.c1.{created}"),
        name: app.to_string(),
        app_id: app.to_string(),
        run_as: ns.to_string(),
        instance_id: instance,
        agent_id: "agent-1".to_string(),
        executor_id: "exec-1".to_string(),
        hostname: "node-1".to_string(),
        status: TaskStatus::Running,
        last_status: TaskStatus::Staging,
        version_name: "v1".to_string(),
        start_time: 1_700_000_000,
        update_time: 1_700_000_100,
        resched_times: 0,
        message: String::new(),
        launch_resource: Some(Resource {
            cpus: 0.5,
            mem: 256.0,
            disk: 0.0,
        }),
        labels: labels(&[("team", "infra")]),
        restart_policy: None,
        kill_policy: None,
        tasks: (0..tasks)
            .map(|i| task(ns, app, instance, created, i))
            .collect(),
    }
}

pub fn agent(ip: &str) -> Agent {
    Agent {
        key: ip.to_string(),
        last_sync_time: 1_700_000_000,
        agent_info: "{\"cpus\":8}".to_string(),
    }
}

pub fn agent_setting(ip: &str) -> AgentSetting {
    AgentSetting {
        inner_ip: ip.to_string(),
        disabled: false,
        attr_strings: HashMap::from([("zone".to_string(), "a".to_string())]),
        attr_scalars: HashMap::from([("weight".to_string(), 1.5)]),
        pods: Vec::new(),
    }
}

pub fn agent_sched_info(host: &str) -> AgentSchedInfo {
    AgentSchedInfo {
        hostname: host.to_string(),
        delta_cpu: 0.5,
        delta_mem: 128.0,
        delta_disk: 0.0,
    }
}

pub fn meta(ns: &str, name: &str) -> ObjectMeta {
    ObjectMeta {
        labels: labels(&[("app", "web")]),
        ..ObjectMeta::new(ns, name)
    }
}

pub fn configmap(ns: &str, name: &str) -> ConfigMap {
    ConfigMap {
        meta: meta(ns, name),
        data: HashMap::from([(
            "app.conf".to_string(),
            ConfigMapItem {
                item_type: ConfigMapItemType::File,
                content: "listen 8080".to_string(),
                remote_url: String::new(),
                remote_user: String::new(),
                remote_password: String::new(),
            },
        )]),
    }
}

pub fn secret(ns: &str, name: &str) -> Secret {
    Secret {
        meta: meta(ns, name),
        secret_type: "Opaque".to_string(),
        data: HashMap::from([(
            "password".to_string(),
            SecretItem {
                path: "/etc/secret".to_string(),
                content: "c2VjcmV0".to_string(),
            },
        )]),
    }
}

pub fn service(ns: &str, name: &str) -> Service {
    Service {
        meta: meta(ns, name),
        spec: ServiceSpec {
            selector: labels(&[("app", "web")]),
            service_type: "ClusterIP".to_string(),
            cluster_ip: vec!["10.96.0.10".to_string()],
            ports: vec![ServicePort {
                name: "http".to_string(),
                protocol: "tcp".to_string(),
                port: 80,
                target_port: 8080,
                node_port: 0,
            }],
        },
    }
}

pub fn endpoint(ns: &str, name: &str) -> Endpoint {
    Endpoint {
        meta: meta(ns, name),
        endpoints: vec![EndpointTarget {
            network_mode: "BRIDGE".to_string(),
            network_ip: "172.17.0.2".to_string(),
            node_ip: "10.0.0.1".to_string(),
            ports: Vec::new(),
        }],
    }
}

pub fn deployment(ns: &str, name: &str) -> Deployment {
    Deployment {
        meta: meta(ns, name),
        selector: labels(&[("app", "web")]),
        strategy: UpgradeStrategy {
            strategy_type: "RollingUpdate".to_string(),
            rolling_update: Some(RollingUpdate {
                max_unavailable: 1,
                max_surge: 1,
                up_interval_secs: 10,
                rolling_order: "CreateFirst".to_string(),
                rolling_manually: false,
            }),
        },
        status: DeploymentStatus::Running,
        application: Some(DeploymentApp {
            application_name: name.to_string(),
            current_target_instances: 2,
        }),
        application_ext: None,
        is_in_rolling: false,
        curr_rolling_op: String::new(),
        raw_json: String::new(),
        message: String::new(),
    }
}

pub fn command(id: &str) -> Command {
    Command {
        id: id.to_string(),
        target: CommandTarget {
            kind: "Application".to_string(),
            namespace: "ns1".to_string(),
            name: "web".to_string(),
            task_groups: vec!["0.web.ns1.c1.100".to_string()],
        },
        cmd: vec!["ls".to_string(), "-l".to_string()],
        env: Vec::new(),
        create_time: 1_700_000_000,
        status: Vec::new(),
    }
}

pub fn crr(kind: &str) -> CustomResourceRegister {
    CustomResourceRegister {
        api_version: "v4".to_string(),
        meta: ObjectMeta::new("", &format!("{}s.example.io", kind.to_lowercase())),
        group: "example.io".to_string(),
        version: "v1".to_string(),
        scope: "Namespaced".to_string(),
        names: CustomResourceNames {
            kind: kind.to_string(),
            plural: format!("{}s", kind.to_lowercase()),
            singular: kind.to_lowercase(),
            short_names: Vec::new(),
        },
    }
}

pub fn crd(kind: &str, ns: &str, name: &str) -> CustomResourceDefinition {
    CustomResourceDefinition {
        api_version: "example.io/v1".to_string(),
        kind: kind.to_string(),
        meta: meta(ns, name),
        spec: serde_json::json!({"replicas": 3, "image": "web:1.0"}),
    }
}

pub fn admission_webhook(ns: &str, name: &str) -> AdmissionWebhookConfiguration {
    AdmissionWebhookConfiguration {
        meta: meta(ns, name),
        resources_ref: ResourcesRef {
            operation: "Create".to_string(),
            kind: "application".to_string(),
        },
        admission_webhooks: vec![AdmissionWebhook {
            name: "policy".to_string(),
            failure_policy: "Fail".to_string(),
            client_config: WebhookClientConfig {
                ca_bundle: String::new(),
                namespace: ns.to_string(),
                name: "policy-svc".to_string(),
                url: String::new(),
            },
        }],
    }
}
