/*!
 * Integration tests for the property collector client
 *
 * These drive the public `Client` surface against a scripted invoker:
 * - Container-scoped power-state queries
 * - Long-poll waits on a single object
 * - Single and multi-target power-on
 */

use serde_json::{json, Value};
use vsphere_collector::invoker::MockInvoker;
use vsphere_collector::{
    Client, ClientConfig, CollectorError, InvokeError, ObjectRef, PowerOnOutcome, ReadySignal,
    ServiceContent, Targets,
};

fn ready_client(mock: &MockInvoker, config: ClientConfig) -> Client {
    let (client, ready): (Client, ReadySignal) = Client::new(mock.clone(), config);
    ready.fire(ServiceContent {
        view_manager: ObjectRef::new("ViewManager", "ViewManager"),
        property_collector: ObjectRef::new("PropertyCollector", "propertyCollector"),
    });
    client
}

fn folder() -> ObjectRef {
    ObjectRef::new("Folder", "group-v3")
}

fn vm(id: &str) -> ObjectRef {
    ObjectRef::new("VirtualMachine", id)
}

fn script_view(mock: &MockInvoker) {
    mock.push(
        "CreateContainerView",
        json!({ "returnval": { "type": "ContainerView", "value": "session[52]view-9" } }),
    );
}

fn task_update(version: &str, filters: &[(&str, &str, Option<Value>)]) -> Value {
    let filter_set: Vec<Value> = filters
        .iter()
        .map(|(filter, state, error)| {
            let mut changes = vec![json!({ "name": "info.state", "op": "assign", "val": state })];
            if let Some(fault) = error {
                changes.push(json!({ "name": "info.error", "op": "assign", "val": fault }));
            }
            json!({
                "filter": { "type": "PropertyFilter", "value": filter },
                "objectSet": [{ "kind": "modify", "changeSet": changes }],
            })
        })
        .collect();

    json!({ "returnval": { "version": version, "filterSet": filter_set } })
}

/// Task refs and filter handles derived from the VM id so concurrent
/// power-ons can be told apart
fn script_task_plumbing(mock: &MockInvoker) {
    mock.respond_with("PowerOnVM_Task", |args| {
        let id = args["_this"]["value"].as_str().unwrap_or_default();
        Ok(json!({ "returnval": { "type": "Task", "value": format!("task-{id}") } }))
    });
    mock.respond_with("CreateFilter", |args| {
        let task = args["spec"]["objectSet"][0]["obj"]["value"]
            .as_str()
            .unwrap_or_default();
        Ok(json!({ "returnval": { "type": "PropertyFilter", "value": format!("filter-{task}") } }))
    });
    mock.respond_with("DestroyPropertyFilter", |_| Ok(json!({})));
}

#[tokio::test]
async fn test_empty_container_yields_no_vms() {
    for empty in [json!({}), json!({ "returnval": null }), json!({ "returnval": { "objects": [] } })] {
        let mock = MockInvoker::new();
        script_view(&mock);
        mock.push("RetrievePropertiesEx", empty);

        let client = ready_client(&mock, ClientConfig::default());
        let states = client.vm_power_states(&folder()).await.unwrap();
        assert!(states.is_empty());
    }
}

#[tokio::test]
async fn test_two_vm_folder_power_states() {
    let mock = MockInvoker::new();
    script_view(&mock);
    mock.push(
        "RetrievePropertiesEx",
        json!({
            "returnval": {
                "objects": [
                    {
                        "obj": { "type": "VirtualMachine", "value": "4" },
                        "propSet": [{ "name": "summary", "val": {
                            "config": { "name": "testvm-win" },
                            "runtime": { "powerState": "poweredOff" },
                        }}],
                    },
                    {
                        "obj": { "type": "VirtualMachine", "value": "5" },
                        "propSet": { "name": "summary", "val": {
                            "config": { "name": "testvm-linux" },
                            "runtime": { "powerState": "poweredOn" },
                        }},
                    },
                ]
            }
        }),
    );

    let client = ready_client(&mock, ClientConfig::default());
    let states = client.vm_power_states(&folder()).await.unwrap();

    assert_eq!(states.len(), 2);
    assert_eq!(states[0].obj, vm("4"));
    assert_eq!(states[0].name, "testvm-win");
    assert_eq!(states[0].power_state, "poweredOff");
    assert_eq!(states[1].obj, vm("5"));
    assert_eq!(states[1].name, "testvm-linux");
    assert_eq!(states[1].power_state, "poweredOn");

    let spec = &mock.calls_to("RetrievePropertiesEx")[0].args["specSet"][0];
    assert_eq!(
        spec["propSet"][0],
        json!({ "type": "VirtualMachine", "all": false, "pathSet": ["summary"] })
    );
}

#[tokio::test]
async fn test_projection_failure_is_structural() {
    let mock = MockInvoker::new();
    script_view(&mock);
    mock.push(
        "RetrievePropertiesEx",
        json!({ "returnval": { "objects": [{
            "obj": { "type": "VirtualMachine", "value": "4" },
            "propSet": [{ "name": "summary", "val": { "runtime": { "powerState": "poweredOn" } } }],
        }]}}),
    );

    let client = ready_client(&mock, ClientConfig::default());
    let err = client.vm_power_states(&folder()).await.unwrap_err();
    assert!(matches!(err, CollectorError::Structural { .. }));
}

#[tokio::test]
async fn test_wait_for_task_state_scenario() {
    let mock = MockInvoker::new();
    mock.push(
        "CreateFilter",
        json!({ "returnval": { "type": "PropertyFilter", "value": "session[52]f-4" } }),
    );
    mock.push("WaitForUpdatesEx", task_update("1", &[("session[52]f-4", "running", None)]));
    mock.push("WaitForUpdatesEx", task_update("2", &[("session[52]f-4", "success", None)]));
    mock.push("DestroyPropertyFilter", json!({}));

    let client = ready_client(&mock, ClientConfig::default());
    let values = client
        .wait_for_values(vm("4"), ["info.state", "info.error"], "state", ["success", "error"])
        .await
        .unwrap();

    assert_eq!(values.len(), 1);
    assert_eq!(values["info.state"], json!("success"));
    assert!(!values.contains_key("info.error"));

    let operations: Vec<String> = mock.calls().into_iter().map(|c| c.operation).collect();
    assert_eq!(
        operations,
        [
            "CreateFilter",
            "WaitForUpdatesEx",
            "WaitForUpdatesEx",
            "DestroyPropertyFilter"
        ]
    );
    let waits = mock.calls_to("WaitForUpdatesEx");
    assert_eq!(waits[0].args["version"], json!(""));
    assert_eq!(waits[1].args["version"], json!("1"));
}

#[tokio::test]
async fn test_power_on_without_targets_sends_nothing() {
    let mock = MockInvoker::new();
    let client = ready_client(&mock, ClientConfig::default());

    let err = client.power_on_vm_by_refs(None).await.unwrap_err();
    assert!(matches!(err, CollectorError::Input(_)));

    let err = client
        .power_on_vm_by_refs(Some(Targets::Many(Vec::new())))
        .await
        .unwrap_err();
    assert!(matches!(err, CollectorError::Input(_)));

    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_single_power_on_resolves_with_state() {
    let mock = MockInvoker::new();
    script_task_plumbing(&mock);
    mock.push("WaitForUpdatesEx", task_update("1", &[("filter-task-vm-1", "success", None)]));

    let client = ready_client(&mock, ClientConfig::default());
    let outcome = client
        .power_on_vm_by_refs(Some(vm("vm-1").into()))
        .await
        .unwrap();

    match outcome {
        PowerOnOutcome::Single(state) => assert_eq!(state, "success"),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(mock.call_count("DestroyPropertyFilter"), 1);
}

#[tokio::test]
async fn test_single_power_on_rejects_with_fault() {
    let mock = MockInvoker::new();
    script_task_plumbing(&mock);
    mock.push(
        "WaitForUpdatesEx",
        task_update(
            "1",
            &[("filter-task-vm-1", "error", Some(json!({ "localizedMessage": "No host" })))],
        ),
    );

    let client = ready_client(&mock, ClientConfig::default());
    let err = client
        .power_on_vm_by_refs(Some(vm("vm-1").into()))
        .await
        .unwrap_err();

    match err {
        CollectorError::TaskFailed { task, fault } => {
            assert_eq!(task.value, "task-vm-1");
            assert_eq!(fault["localizedMessage"], "No host");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_many_power_ons_report_in_completion_order() {
    let mock = MockInvoker::new();
    script_task_plumbing(&mock);
    mock.respond_with("WaitForUpdatesEx", |args| {
        let fault = json!({ "localizedMessage": "Insufficient resources" });
        Ok(match args["version"].as_str().unwrap_or_default() {
            "" => task_update(
                "1",
                &[
                    ("filter-task-vm-1", "running", None),
                    ("filter-task-vm-2", "error", Some(fault)),
                ],
            ),
            "1" => task_update("2", &[("filter-task-vm-1", "running", None)]),
            "2" => task_update("3", &[("filter-task-vm-1", "running", None)]),
            _ => task_update("4", &[("filter-task-vm-1", "success", None)]),
        })
    });

    let client = ready_client(&mock, ClientConfig::default());
    let outcome = client
        .power_on_vm_by_refs(Some(vec![vm("vm-1"), vm("vm-2")].into()))
        .await
        .unwrap();

    let outcomes = outcome.outcomes();
    assert_eq!(outcomes.len(), 2);

    assert_eq!(outcomes[0].target, vm("vm-2"));
    assert!(matches!(
        outcomes[0].result,
        Err(CollectorError::TaskFailed { .. })
    ));

    assert_eq!(outcomes[1].target, vm("vm-1"));
    assert_eq!(outcomes[1].result.as_ref().unwrap(), "success");

    assert_eq!(mock.call_count("DestroyPropertyFilter"), 2);
    assert_eq!(mock.max_in_flight("PowerOnVM_Task"), 2);
}

#[tokio::test]
async fn test_failed_target_does_not_stop_the_others() {
    let mock = MockInvoker::new();
    script_task_plumbing(&mock);
    mock.respond_with("PowerOnVM_Task", |args| {
        let id = args["_this"]["value"].as_str().unwrap_or_default();
        if id == "vm-1" {
            return Err(InvokeError::Fault {
                operation: "PowerOnVM_Task".into(),
                message: "InvalidPowerState".into(),
            });
        }
        Ok(json!({ "returnval": { "type": "Task", "value": format!("task-{id}") } }))
    });
    mock.respond_with("WaitForUpdatesEx", |_| {
        Ok(task_update("1", &[("filter-task-vm-2", "success", None)]))
    });

    let client = ready_client(&mock, ClientConfig::default());
    let outcome = client
        .power_on_vm_by_refs(Some(vec![vm("vm-1"), vm("vm-2")].into()))
        .await
        .unwrap();

    let outcomes = outcome.outcomes();
    assert_eq!(outcomes.len(), 2);

    let failed = outcomes.iter().find(|o| o.target == vm("vm-1")).unwrap();
    assert!(failed.result.as_ref().is_err_and(CollectorError::is_transport));

    let succeeded = outcomes.iter().find(|o| o.target == vm("vm-2")).unwrap();
    assert_eq!(succeeded.result.as_ref().unwrap(), "success");
}

#[tokio::test]
async fn test_concurrency_limit_serializes_power_ons() {
    let mock = MockInvoker::new();
    script_task_plumbing(&mock);
    mock.respond_with("WaitForUpdatesEx", |_| {
        Ok(task_update(
            "1",
            &[
                ("filter-task-vm-1", "success", None),
                ("filter-task-vm-2", "success", None),
                ("filter-task-vm-3", "success", None),
            ],
        ))
    });

    let config = ClientConfig {
        max_concurrent_tasks: 1,
        ..Default::default()
    };
    let client = ready_client(&mock, config);
    let outcome = client
        .power_on_vm_by_refs(Some(vec![vm("vm-1"), vm("vm-2"), vm("vm-3")].into()))
        .await
        .unwrap();

    let order: Vec<&str> = outcome
        .outcomes()
        .iter()
        .map(|o| o.target.value.as_str())
        .collect();
    assert_eq!(order, ["vm-1", "vm-2", "vm-3"]);
    assert_eq!(mock.max_in_flight("WaitForUpdatesEx"), 1);
    assert_eq!(mock.max_in_flight("PowerOnVM_Task"), 1);
}
