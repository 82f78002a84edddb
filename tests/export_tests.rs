//! Export module tests

use process_package_sdk::export::entity_key;
use process_package_sdk::{
    Category, DependentType, Entity, EntityKind, ExportError, Group, InMemoryRepository,
    NotificationSetting, PackageExporter, Process, Screen, User,
};
use uuid::Uuid;

fn user(id: i64, username: &str) -> Entity {
    Entity::User(User {
        id,
        uuid: Uuid::new_v4(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        firstname: String::new(),
        lastname: String::new(),
    })
}

fn group(id: i64, name: &str) -> Entity {
    Entity::Group(Group {
        id,
        uuid: Uuid::new_v4(),
        name: name.to_string(),
        description: String::new(),
    })
}

fn screen(id: i64, title: &str) -> Entity {
    Entity::Screen(Screen {
        id,
        uuid: Uuid::new_v4(),
        title: title.to_string(),
        description: String::new(),
        screen_type: "FORM".to_string(),
        category_ids: Vec::new(),
        config: serde_json::json!([]),
    })
}

fn process(id: i64, name: &str, bpmn: &str) -> Process {
    Process {
        id,
        uuid: Uuid::new_v4(),
        name: name.to_string(),
        description: String::new(),
        package_key: None,
        owner_user_id: None,
        cancel_screen_id: None,
        request_detail_screen_id: None,
        category_ids: Vec::new(),
        notification_settings: Vec::new(),
        bpmn: bpmn.to_string(),
    }
}

const EMPTY_BPMN: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL" xmlns:pm="http://bpm.example.com/schema/extensions">
  <bpmn:process id="ProcessId-1"/>
</bpmn:definitions>"#;

mod process_export_tests {
    use super::*;

    #[test]
    fn test_export_full_process_tree() {
        let mut repo = InMemoryRepository::new();
        repo.insert(user(10, "pm.admin"));
        repo.insert(user(1, "alice"));
        repo.insert(group(5, "approvers"));
        repo.insert(screen(20, "Cancel request"));
        repo.insert(Entity::Category(Category {
            id: 3,
            uuid: Uuid::new_v4(),
            name: "Operations".to_string(),
        }));

        let bpmn = r#"<?xml version="1.0" encoding="UTF-8"?>
<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL" xmlns:pm="http://bpm.example.com/schema/extensions">
  <bpmn:signal id="S1" name="Order shipped" pm:detail="fires on fulfilment"/>
  <bpmn:process id="ProcessId-100">
    <bpmn:task id="task1" pm:assignment="user" pm:assignedUsers="1"/>
    <bpmn:intermediateThrowEvent id="evt1">
      <bpmn:signalEventDefinition signalRef="S1"/>
    </bpmn:intermediateThrowEvent>
  </bpmn:process>
</bpmn:definitions>"#;

        let mut source = process(100, "Order fulfilment", bpmn);
        source.owner_user_id = Some(10);
        source.cancel_screen_id = Some(20);
        source.category_ids = vec![3];
        source.notification_settings = vec![NotificationSetting {
            process_id: Some(100),
            element_id: None,
            notifiable_type: "requester".to_string(),
            notification_type: "started".to_string(),
        }];
        repo.insert(Entity::Process(source.clone()));

        let manifest = PackageExporter::new(&repo)
            .export(&Entity::Process(source))
            .unwrap();

        assert_eq!(manifest.root, entity_key(EntityKind::Process, 100));
        assert!(!manifest.encrypted);

        let root = manifest.export.as_ref().unwrap();
        assert_eq!(root.kind, EntityKind::Process);

        let types: Vec<DependentType> =
            root.dependents.iter().map(|d| d.dependent_type).collect();
        assert!(types.contains(&DependentType::User));
        assert!(types.contains(&DependentType::Category));
        assert!(types.contains(&DependentType::CancelScreen));
        assert!(types.contains(&DependentType::UserAssignment));

        // The global signal travels as a reference, not a dependent edge.
        let signals = &root.references["global-signals"];
        assert_eq!(signals[0]["id"], "S1");
        assert_eq!(signals[0]["detail"], "fires on fulfilment");

        // Notification settings carried verbatim.
        let settings = &root.references["notification_settings"];
        assert_eq!(settings[0]["notification_type"], "started");

        // Assignment metadata carries path and type.
        let assignment = root
            .dependents
            .iter()
            .find(|d| d.dependent_type == DependentType::UserAssignment)
            .unwrap();
        assert_eq!(assignment.meta["assignmentType"], "user");
        assert!(
            assignment.meta["path"]
                .as_str()
                .unwrap()
                .ends_with("bpmn:task[1]")
        );
    }

    #[test]
    fn test_missing_cancel_screen_is_fatal() {
        let mut repo = InMemoryRepository::new();
        let mut source = process(1, "Broken", EMPTY_BPMN);
        source.cancel_screen_id = Some(999);
        repo.insert(Entity::Process(source.clone()));

        let err = PackageExporter::new(&repo)
            .export(&Entity::Process(source))
            .unwrap_err();
        assert!(matches!(
            err,
            ExportError::MissingEntity {
                kind: EntityKind::Screen,
                id: 999
            }
        ));
    }

    #[test]
    fn test_missing_assigned_user_is_skipped() {
        let mut repo = InMemoryRepository::new();
        repo.insert(user(1, "alice"));

        let bpmn = r#"<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL">
  <bpmn:process id="ProcessId-1">
    <bpmn:task id="task1" pm:assignment="user" pm:assignedUsers="1,404"/>
  </bpmn:process>
</bpmn:definitions>"#;
        let source = process(1, "Partial", bpmn);
        repo.insert(Entity::Process(source.clone()));

        let manifest = PackageExporter::new(&repo)
            .export(&Entity::Process(source))
            .unwrap();
        let root = manifest.export.unwrap();
        let assignments: Vec<_> = root
            .dependents
            .iter()
            .filter(|d| d.dependent_type == DependentType::UserAssignment)
            .collect();
        // User 404 is gone; only alice's edge survives.
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].entity.key, entity_key(EntityKind::User, 1));
    }
}

mod subprocess_tests {
    use super::*;

    #[test]
    fn test_non_subprocess_call_activities_excluded() {
        let mut repo = InMemoryRepository::new();
        // Process 7 belongs to an installed package.
        let mut packaged = process(7, "Packaged", EMPTY_BPMN);
        packaged.package_key = Some("vendor/pkg".to_string());
        repo.insert(Entity::Process(packaged));
        repo.insert(Entity::Process(process(8, "Local", EMPTY_BPMN)));

        let bpmn = r#"<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL">
  <bpmn:process id="ProcessId-1">
    <bpmn:callActivity id="c1" calledElement="some-literal"/>
    <bpmn:callActivity id="c2" calledElement="ProcessId-abc"/>
    <bpmn:callActivity id="c3" calledElement="ProcessId-7-extra"/>
    <bpmn:callActivity id="c4" calledElement="ProcessId-7"/>
    <bpmn:callActivity id="c5" calledElement="ProcessId-8"/>
    <bpmn:callActivity id="c6"/>
  </bpmn:process>
</bpmn:definitions>"#;
        let source = process(1, "Caller", bpmn);
        repo.insert(Entity::Process(source.clone()));

        let manifest = PackageExporter::new(&repo)
            .export(&Entity::Process(source))
            .unwrap();
        let root = manifest.export.unwrap();
        let subs: Vec<_> = root
            .dependents
            .iter()
            .filter(|d| d.dependent_type == DependentType::SubProcess)
            .collect();

        // Only the plain local reference counts: literals, malformed ids and
        // package-owned targets are ordinary call activities.
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].entity.key, entity_key(EntityKind::Process, 8));
        assert!(
            subs[0].meta["path"]
                .as_str()
                .unwrap()
                .ends_with("bpmn:callActivity[4]")
        );
    }

    #[test]
    fn test_mutual_subprocess_cycle_terminates() {
        let mut repo = InMemoryRepository::new();
        let bpmn_a = r#"<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL">
  <bpmn:process id="ProcessId-1">
    <bpmn:callActivity id="c1" calledElement="ProcessId-2"/>
  </bpmn:process>
</bpmn:definitions>"#;
        let bpmn_b = r#"<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL">
  <bpmn:process id="ProcessId-2">
    <bpmn:callActivity id="c1" calledElement="ProcessId-1"/>
  </bpmn:process>
</bpmn:definitions>"#;
        let a = process(1, "A", bpmn_a);
        repo.insert(Entity::Process(a.clone()));
        repo.insert(Entity::Process(process(2, "B", bpmn_b)));

        let manifest = PackageExporter::new(&repo)
            .export(&Entity::Process(a))
            .unwrap();

        let root = manifest.export.as_ref().unwrap();
        let b_node = &root.dependents[0].entity;
        assert_eq!(b_node.key, entity_key(EntityKind::Process, 2));
        // B's edge back to A is a key-only stub, not an infinite nesting.
        let back = &b_node.dependents[0].entity;
        assert_eq!(back.key, entity_key(EntityKind::Process, 1));
        assert!(back.attributes.is_null());
    }

    #[test]
    fn test_subprocess_exported_once_when_called_twice() {
        let mut repo = InMemoryRepository::new();
        repo.insert(Entity::Process(process(2, "Shared", EMPTY_BPMN)));

        let bpmn = r#"<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL">
  <bpmn:process id="ProcessId-1">
    <bpmn:callActivity id="c1" calledElement="ProcessId-2"/>
    <bpmn:callActivity id="c2" calledElement="ProcessId-2"/>
  </bpmn:process>
</bpmn:definitions>"#;
        let source = process(1, "Caller", bpmn);
        repo.insert(Entity::Process(source.clone()));

        let manifest = PackageExporter::new(&repo)
            .export(&Entity::Process(source))
            .unwrap();
        let root = manifest.export.unwrap();

        // Two edges, two distinct paths, one shared child (the second is a
        // stub of the first).
        let subs: Vec<_> = root
            .dependents
            .iter()
            .filter(|d| d.dependent_type == DependentType::SubProcess)
            .collect();
        assert_eq!(subs.len(), 2);
        assert_ne!(subs[0].meta["path"], subs[1].meta["path"]);
        assert_eq!(subs[0].entity.key, subs[1].entity.key);
        assert!(!subs[0].entity.attributes.is_null());
        assert!(subs[1].entity.attributes.is_null());
    }
}

mod screen_export_tests {
    use super::*;

    #[test]
    fn test_nested_screens_followed_through_config() {
        let mut repo = InMemoryRepository::new();
        repo.insert(screen(21, "Inner"));
        let outer = Screen {
            id: 20,
            uuid: Uuid::new_v4(),
            title: "Outer".to_string(),
            description: String::new(),
            screen_type: "FORM".to_string(),
            category_ids: Vec::new(),
            config: serde_json::json!([
                { "items": [ { "component": "FormNestedScreen", "config": { "screen": 21 } } ] }
            ]),
        };
        repo.insert(Entity::Screen(outer.clone()));

        let manifest = PackageExporter::new(&repo)
            .export(&Entity::Screen(outer))
            .unwrap();
        let root = manifest.export.unwrap();
        let nested: Vec<_> = root
            .dependents
            .iter()
            .filter(|d| d.dependent_type == DependentType::NestedScreen)
            .collect();
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].entity.key, entity_key(EntityKind::Screen, 21));
        assert_eq!(nested[0].meta["pointer"], "/0/items/0/config/screen");
    }
}
