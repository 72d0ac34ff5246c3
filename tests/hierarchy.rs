//! Hierarchy queries over a manifest-loaded workspace.

use anyhow::Result;
use bytegraph::manifest::WorkspaceManifest;
use bytegraph::{ClassInfo, InheritanceGraph, MethodMember, Resource, Workspace, ROOT_TYPE};
use std::sync::Arc;

const MANIFEST: &str = r#"{
    "primary": {
        "name": "zoo.jar",
        "classes": [
            { "name": "zoo/Animal", "super_name": "java/lang/Object",
              "methods": [ { "name": "speak", "descriptor": "()V" } ] },
            { "name": "zoo/Dog", "super_name": "zoo/Animal", "interfaces": [ "zoo/Pet" ],
              "methods": [ { "name": "speak", "descriptor": "()V" } ] },
            { "name": "zoo/Cat", "super_name": "zoo/Animal", "interfaces": [ "zoo/Pet" ] },
            { "name": "zoo/Pet", "super_name": "java/lang/Object", "access": 1537 },
            { "name": "zoo/Puppy", "super_name": "zoo/Dog" },
            { "name": "zoo/Rock", "super_name": "java/lang/Object" },
            { "name": "zoo/Window", "super_name": "ui/Frame" }
        ]
    },
    "libraries": [
        { "name": "rt.jar", "classes": [ { "name": "java/lang/Object" } ] },
        { "name": "ui.jar", "classes": [
            { "name": "ui/Frame", "super_name": "java/lang/Object",
              "methods": [ { "name": "paint", "descriptor": "()V" } ] }
        ] }
    ]
}"#;

fn load() -> Result<InheritanceGraph> {
    let workspace = WorkspaceManifest::from_json(MANIFEST)?.into_workspace();
    Ok(InheritanceGraph::new(Arc::new(workspace)))
}

fn names(vertices: impl IntoIterator<Item = Arc<bytegraph::InheritanceVertex>>) -> Vec<String> {
    let mut names: Vec<String> = vertices.into_iter().map(|v| v.name().to_string()).collect();
    names.sort();
    names
}

#[test]
fn test_family_is_connected_component() -> Result<()> {
    let graph = load()?;

    let family = names(graph.family("zoo/Puppy", false));
    assert_eq!(
        family,
        vec!["zoo/Animal", "zoo/Cat", "zoo/Dog", "zoo/Pet", "zoo/Puppy"]
    );

    // The root is shared by everyone, but never joins unrelated classes
    let with_root = names(graph.family("zoo/Puppy", true));
    assert!(with_root.contains(&ROOT_TYPE.to_string()));
    assert!(!with_root.contains(&"zoo/Rock".to_string()));

    // Same family from any member
    assert_eq!(names(graph.family("zoo/Cat", false)), family);
    Ok(())
}

#[test]
fn test_common_ancestor_is_shared_and_floors_at_root() -> Result<()> {
    let graph = load()?;

    let pairs = [
        ("zoo/Puppy", "zoo/Cat"),
        ("zoo/Dog", "zoo/Puppy"),
        ("zoo/Puppy", "zoo/Rock"),
        ("zoo/Window", "zoo/Dog"),
        ("zoo/Missing", "zoo/Dog"),
    ];
    for (first, second) in pairs {
        let common = graph.common_ancestor(first, second);
        assert!(graph.is_assignable_from(&common, second), "{first} {second} -> {common}");
        if graph.vertex(first).is_some() {
            assert!(graph.is_assignable_from(&common, first), "{first} {second} -> {common}");
        }
    }

    assert_eq!(graph.common_ancestor("zoo/Puppy", "zoo/Cat"), "zoo/Animal");
    assert_eq!(graph.common_ancestor("zoo/Dog", "zoo/Puppy"), "zoo/Dog");
    assert_eq!(graph.common_ancestor("zoo/Puppy", "zoo/Rock"), ROOT_TYPE);
    assert_eq!(graph.common_ancestor("zoo/Missing", "zoo/Dog"), ROOT_TYPE);
    Ok(())
}

#[test]
fn test_ancestors_and_descendants() -> Result<()> {
    let graph = load()?;

    let ancestors = names(graph.all_parents("zoo/Puppy"));
    assert_eq!(
        ancestors,
        vec![ROOT_TYPE, "zoo/Animal", "zoo/Dog", "zoo/Pet"]
    );
    let descendants = names(graph.all_children("zoo/Animal"));
    assert_eq!(descendants, vec!["zoo/Cat", "zoo/Dog", "zoo/Puppy"]);
    assert_eq!(graph.direct_children("zoo/Pet"), vec!["zoo/Cat", "zoo/Dog"]);
    assert!(graph.all_parents("zoo/Missing").is_empty());
    Ok(())
}

#[test]
fn test_library_definitions() -> Result<()> {
    let graph = load()?;

    let window = graph.vertex("zoo/Window").expect("window vertex");
    assert!(window.is_primary());
    assert!(window.is_library_definition());
    assert!(window.is_library_member("paint", "()V"));

    // Extending only the root type does not count
    let rock = graph.vertex("zoo/Rock").expect("rock vertex");
    assert!(!rock.is_library_definition());

    let puppy = graph.vertex("zoo/Puppy").expect("puppy vertex");
    assert!(!puppy.is_library_definition());
    assert!(puppy.has_member_in_self_or_ancestors("speak", "()V"));
    assert!(!puppy.is_library_member("speak", "()V"));
    Ok(())
}

#[test]
fn test_cyclic_hierarchy_terminates() -> Result<()> {
    let primary = Resource::builder("cycle.jar")
        .class(ClassInfo::builder("c/A").super_name("c/B").build())
        .class(ClassInfo::builder("c/B").super_name("c/C").build())
        .class(ClassInfo::builder("c/C").super_name("c/A").build())
        .build();
    let graph = InheritanceGraph::new(Arc::new(Workspace::new(primary)));

    assert_eq!(names(graph.all_parents("c/A")), vec!["c/B", "c/C"]);
    assert_eq!(names(graph.all_children("c/A")), vec!["c/B", "c/C"]);
    assert_eq!(names(graph.family("c/B", false)), vec!["c/A", "c/B", "c/C"]);
    // No root reachable through the cycle, so the floor applies
    assert_eq!(graph.common_ancestor("c/A", "c/Z"), ROOT_TYPE);
    Ok(())
}

#[test]
fn test_graph_follows_bundle_edits() -> Result<()> {
    let graph = load()?;
    let primary = graph.workspace().primary().clone();

    primary.classes().put(
        ClassInfo::builder("zoo/Wolf")
            .super_name("zoo/Dog")
            .method(MethodMember::new("howl", "()V"))
            .build(),
    )?;
    assert!(graph.vertex("zoo/Dog").expect("dog").is_parent_of("zoo/Wolf"));
    assert!(names(graph.all_children("zoo/Animal")).contains(&"zoo/Wolf".to_string()));

    // Re-parent the cat away from the animal
    primary
        .classes()
        .put(ClassInfo::builder("zoo/Cat").super_name("java/lang/Object").build())?;
    assert_eq!(graph.direct_children("zoo/Animal"), vec!["zoo/Dog"]);

    primary.classes().remove("zoo/Wolf")?;
    assert!(graph.vertex("zoo/Wolf").is_none());
    assert_eq!(graph.direct_children("zoo/Dog"), vec!["zoo/Puppy"]);
    Ok(())
}
