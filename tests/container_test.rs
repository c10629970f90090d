//! Tests for ServiceContainer: namespace lifecycle and snapshot persistence

use std::fs;
use std::sync::Barrier;
use std::thread;

use rstest::{fixture, rstest};
use tempfile::TempDir;

use arborist::application::ApplicationError;
use arborist::config::{CascadeConfig, CascadeMode, Settings};
use arborist::domain::{MenuPayload, NodeDraft, NodeId, TreeKind};
use arborist::infrastructure::di::ServiceContainer;
use arborist::infrastructure::InfraError;
use arborist::util::testing;

fn settings_in(dir: &TempDir) -> Settings {
    Settings {
        data_dir: dir.path().to_path_buf(),
        ..Settings::default()
    }
}

#[fixture]
fn data_dir() -> TempDir {
    testing::init_test_setup();
    TempDir::new().unwrap()
}

#[rstest]
fn given_initialized_namespace_when_reopened_in_new_container_then_nodes_survive(data_dir: TempDir) {
    // Arrange
    let container = ServiceContainer::new(settings_in(&data_dir)).unwrap();
    let service = container.init_namespace("menu", TreeKind::Menu).unwrap();
    service
        .create(
            None,
            NodeDraft::menu(
                "Home",
                MenuPayload {
                    path: "/home".into(),
                    ..MenuPayload::default()
                },
            ),
        )
        .unwrap();
    container.save("menu").unwrap();

    // Act
    let reopened = ServiceContainer::new(settings_in(&data_dir)).unwrap();
    let service = reopened.open("menu").unwrap();

    // Assert
    assert_eq!(service.kind(), TreeKind::Menu);
    assert_eq!(service.get_by_id(NodeId(1)).unwrap().label, "Home");
    assert!(!service.check_path_available("/home", None).unwrap());
}

#[rstest]
fn given_nested_namespace_when_saved_then_file_name_maps_slashes(data_dir: TempDir) {
    let container = ServiceContainer::new(settings_in(&data_dir)).unwrap();

    container
        .init_namespace("operator/basic", TreeKind::Category)
        .unwrap();

    assert!(data_dir.path().join("operator__basic.forest.json").exists());
    assert_eq!(container.list_namespaces().unwrap(), vec!["operator/basic"]);
}

#[rstest]
fn given_existing_snapshot_when_init_again_then_namespace_exists(data_dir: TempDir) {
    let container = ServiceContainer::new(settings_in(&data_dir)).unwrap();
    container.init_namespace("task", TreeKind::Category).unwrap();

    let fresh = ServiceContainer::new(settings_in(&data_dir)).unwrap();
    let result = fresh.init_namespace("task", TreeKind::Category);

    assert!(matches!(
        result,
        Err(InfraError::Application(ApplicationError::NamespaceExists(_)))
    ));
}

#[rstest]
fn given_missing_snapshot_when_open_then_unknown_namespace(data_dir: TempDir) {
    let container = ServiceContainer::new(settings_in(&data_dir)).unwrap();

    let result = container.open("workflow");

    assert!(matches!(
        result,
        Err(InfraError::Application(ApplicationError::UnknownNamespace(_)))
    ));
}

#[rstest]
fn given_corrupt_snapshot_when_open_then_serialization_error(data_dir: TempDir) {
    fs::write(data_dir.path().join("menu.forest.json"), "{ not json").unwrap();
    let container = ServiceContainer::new(settings_in(&data_dir)).unwrap();

    let result = container.open("menu");

    assert!(matches!(result, Err(InfraError::Serialization { .. })));
}

#[rstest]
fn given_references_when_cascade_delete_saved_then_purge_persists(data_dir: TempDir) {
    // Arrange
    let container = ServiceContainer::new(settings_in(&data_dir)).unwrap();
    let service = container
        .init_namespace("operator/basic", TreeKind::Category)
        .unwrap();
    let parent = service.create(None, NodeDraft::category("Readers")).unwrap();
    let leaf = service
        .create(Some(parent.id), NodeDraft::category("CSV"))
        .unwrap();
    let refs = container.references("operator/basic").unwrap();
    refs.add("csv-reader", leaf.id);
    refs.add("csv-writer", leaf.id);
    container.save("operator/basic").unwrap();

    // Act
    service.delete(parent.id, true).unwrap();
    container.save("operator/basic").unwrap();

    // Assert
    let reopened = ServiceContainer::new(settings_in(&data_dir)).unwrap();
    assert!(reopened.references("operator/basic").unwrap().is_empty());
    assert_eq!(reopened.open("operator/basic").unwrap().node_count(), 0);
}

#[rstest]
fn given_reassign_policy_when_cascade_delete_then_references_moved(data_dir: TempDir) {
    // Arrange
    let settings = Settings {
        cascade: CascadeConfig {
            policy: CascadeMode::Reassign,
            reassign_to: Some(1),
        },
        ..settings_in(&data_dir)
    };
    let container = ServiceContainer::new(settings).unwrap();
    let service = container.init_namespace("task", TreeKind::Category).unwrap();
    let fallback = service.create(None, NodeDraft::category("Default")).unwrap();
    let doomed = service.create(None, NodeDraft::category("Nightly")).unwrap();
    let refs = container.references("task").unwrap();
    refs.add("backup", doomed.id);

    // Act
    service.delete(doomed.id, false).unwrap();

    // Assert
    assert_eq!(refs.resources()[0].category_id, fallback.id);
}

#[test]
fn given_reassign_without_target_when_building_container_then_config_error() {
    let dir = TempDir::new().unwrap();
    let settings = Settings {
        cascade: CascadeConfig {
            policy: CascadeMode::Reassign,
            reassign_to: None,
        },
        ..settings_in(&dir)
    };

    let result = ServiceContainer::new(settings);

    assert!(matches!(
        result,
        Err(InfraError::Application(ApplicationError::Config { .. }))
    ));
}

#[rstest]
fn given_invalid_namespace_when_init_then_rejected_without_writing(data_dir: TempDir) {
    let container = ServiceContainer::new(settings_in(&data_dir)).unwrap();

    let result = container.init_namespace("../escape", TreeKind::Menu);

    assert!(result.is_err());
    assert!(container.list_namespaces().unwrap().is_empty());
}

#[rstest]
fn given_concurrent_first_opens_when_refs_added_then_cascade_reaches_them(data_dir: TempDir) {
    // Arrange: a persisted namespace holding one node
    let ns = "operator/script";
    let seeded = ServiceContainer::new(settings_in(&data_dir)).unwrap();
    let service = seeded.init_namespace(ns, TreeKind::Category).unwrap();
    service.create(None, NodeDraft::category("Shell")).unwrap();
    seeded.save(ns).unwrap();

    for _ in 0..25 {
        let container = ServiceContainer::new(settings_in(&data_dir)).unwrap();
        let barrier = Barrier::new(8);

        // Act: first opens race each other
        thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    barrier.wait();
                    container.open(ns).unwrap();
                });
            }
        });
        let refs = container.references(ns).unwrap();
        refs.add("bash", NodeId(1));
        container.open(ns).unwrap().delete(NodeId(1), true).unwrap();

        // Assert: the published store is the one the engine notified
        assert!(refs.is_empty());
        assert!(container.references(ns).unwrap().is_empty());
    }
}

#[rstest]
fn given_reassign_target_missing_from_namespace_when_cascade_delete_then_refs_purged(
    data_dir: TempDir,
) {
    // Arrange: the global reassign target does not exist in this namespace
    let settings = Settings {
        cascade: CascadeConfig {
            policy: CascadeMode::Reassign,
            reassign_to: Some(99),
        },
        ..settings_in(&data_dir)
    };
    let container = ServiceContainer::new(settings).unwrap();
    let service = container
        .init_namespace("operator/basic", TreeKind::Category)
        .unwrap();
    let node = service.create(None, NodeDraft::category("Readers")).unwrap();
    let refs = container.references("operator/basic").unwrap();
    refs.add("csv", node.id);

    // Act
    service.delete(node.id, true).unwrap();

    // Assert: nothing left pointing at a node outside the forest
    assert!(refs.is_empty());
}
