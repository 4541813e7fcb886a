//! End-to-end routing graph scenarios.

use pulso_core::graph::{
    GraphError, GraphEvent, Module, ModuleCategory, PortDirection, PortKind, RoutingGraph,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// M1 with one audio output, M2 with one audio input. Connect, then remove
/// M1: the connection must be cascaded away while M2 survives.
#[test]
fn remove_source_module_cascades() {
    let mut graph = RoutingGraph::new();
    let m1 = graph.add_module(Module::new("M1", ModuleCategory::Generator).with_audio_out("Out"));
    let m2 = graph.add_module(Module::new("M2", ModuleCategory::Effect).with_audio_in("In"));

    let out = graph.module(m1).unwrap().ports()[0].id;
    let inp = graph.module(m2).unwrap().ports()[0].id;

    graph
        .create_connection(m1, out, m2, inp, PortKind::Audio)
        .expect("valid connection");
    assert_eq!(graph.connection_count(), 1);

    assert!(graph.remove_module(m1));
    assert_eq!(graph.connection_count(), 0);
    assert!(graph.module(m2).is_some());
    assert!(graph.module(m2).unwrap().ports()[0]
        .connection_ids()
        .is_empty());
}

#[test]
fn duplicate_connection_returns_same_id() {
    let mut graph = RoutingGraph::new();
    let m1 = graph.add_module(Module::new("M1", ModuleCategory::Generator).with_audio_out("Out"));
    let m2 = graph.add_module(Module::new("M2", ModuleCategory::Effect).with_audio_in("In"));
    let out = graph.module(m1).unwrap().ports()[0].id;
    let inp = graph.module(m2).unwrap().ports()[0].id;

    let first = graph
        .create_connection(m1, out, m2, inp, PortKind::Audio)
        .unwrap();
    let second = graph
        .create_connection(m1, out, m2, inp, PortKind::Audio)
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(graph.connection_count(), 1);
}

#[test]
fn all_incompatible_pairings_rejected() {
    let mut graph = RoutingGraph::new();
    let gen = graph.add_module(
        Module::new("gen", ModuleCategory::Generator)
            .with_audio_out("Audio Out")
            .with_port("Ctl Out", PortKind::Control, PortDirection::Output),
    );
    let fx = graph.add_module(
        Module::new("fx", ModuleCategory::Effect)
            .with_audio_in("Audio In")
            .with_port("Side", PortKind::Sidechain, PortDirection::Input)
            .with_port("Ctl In", PortKind::Control, PortDirection::Input),
    );

    let audio_out = graph.module(gen).unwrap().ports()[0].id;
    let ctl_out = graph.module(gen).unwrap().ports()[1].id;
    let audio_in = graph.module(fx).unwrap().ports()[0].id;
    let side_in = graph.module(fx).unwrap().ports()[1].id;
    let ctl_in = graph.module(fx).unwrap().ports()[2].id;

    // control -> audio
    assert!(graph
        .create_connection(gen, ctl_out, fx, audio_in, PortKind::Control)
        .is_err());
    // audio -> control
    assert!(graph
        .create_connection(gen, audio_out, fx, ctl_in, PortKind::Audio)
        .is_err());
    // control -> sidechain
    assert!(graph
        .create_connection(gen, ctl_out, fx, side_in, PortKind::Control)
        .is_err());
    assert_eq!(graph.connection_count(), 0);

    // The legal pairings all work.
    assert!(graph
        .create_connection(gen, audio_out, fx, audio_in, PortKind::Audio)
        .is_ok());
    assert!(graph
        .create_connection(gen, audio_out, fx, side_in, PortKind::Audio)
        .is_ok());
    assert!(graph
        .create_connection(gen, ctl_out, fx, ctl_in, PortKind::Control)
        .is_ok());
    assert_eq!(graph.connection_count(), 3);
}

#[test]
fn missing_endpoints_are_validation_errors() {
    let mut graph = RoutingGraph::new();
    let m1 = graph.add_module(Module::new("M1", ModuleCategory::Generator).with_audio_out("Out"));
    let out = graph.module(m1).unwrap().ports()[0].id;

    let m2 = graph.add_module(Module::new("M2", ModuleCategory::Effect).with_audio_in("In"));
    let inp = graph.module(m2).unwrap().ports()[0].id;
    graph.remove_module(m2);

    assert!(matches!(
        graph.create_connection(m1, out, m2, inp, PortKind::Audio),
        Err(GraphError::ModuleNotFound(_))
    ));

    // Wrong port on a live module.
    assert!(matches!(
        graph.create_connection(m1, inp, m1, out, PortKind::Audio),
        Err(GraphError::PortNotFound { .. })
    ));
}

#[test]
fn notifications_fire_in_mutation_order() {
    let mut graph = RoutingGraph::new();
    let log = Arc::new(std::sync::Mutex::new(Vec::new()));
    let log_clone = Arc::clone(&log);
    graph.subscribe(move |event: &GraphEvent| {
        log_clone.lock().unwrap().push(*event);
    });

    let m1 = graph.add_module(Module::new("M1", ModuleCategory::Generator).with_audio_out("Out"));
    let m2 = graph.add_module(Module::new("M2", ModuleCategory::Effect).with_audio_in("In"));
    let out = graph.module(m1).unwrap().ports()[0].id;
    let inp = graph.module(m2).unwrap().ports()[0].id;
    let conn = graph
        .create_connection(m1, out, m2, inp, PortKind::Audio)
        .unwrap();
    graph.remove_module(m1);

    let events = log.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            GraphEvent::ModuleAdded(m1),
            GraphEvent::ModuleAdded(m2),
            GraphEvent::ConnectionCreated(conn),
            // Cascade removes the connection before the module notification.
            GraphEvent::ConnectionRemoved(conn),
            GraphEvent::ModuleRemoved(m1),
        ]
    );
}

#[test]
fn listener_mutation_count_matches() {
    let mut graph = RoutingGraph::new();
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    graph.subscribe(move |_: &GraphEvent| {
        c.fetch_add(1, Ordering::SeqCst);
    });

    for i in 0..10 {
        graph.add_effect_module(format!("fx {i}"));
    }
    assert_eq!(count.load(Ordering::SeqCst), 10);
}
