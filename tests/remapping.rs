//! Mapping application against live workspaces.

use anyhow::Result;
use bytegraph::manifest::WorkspaceManifest;
use bytegraph::mapping::{ClassRemapper, MappingFormat, Mappings, SimpleFormat, StructuralRemapper};
use bytegraph::{
    ClassInfo, EmptyMappings, Error, FieldMember, HierarchyMappings, InheritanceGraph,
    IntermediateMappings, LocalVariable, MappingApplier, MethodMember, Resource, Workspace,
};
use std::sync::Arc;

fn workspace() -> Arc<Workspace> {
    let primary = Resource::builder("app.jar")
        .class(
            ClassInfo::builder("app/Base")
                .super_name("java/lang/Object")
                .field(FieldMember::new("count", "I"))
                .method(MethodMember::new("<init>", "()V"))
                .method(MethodMember::new("run", "(Lapp/Base;)V"))
                .build(),
        )
        .class(
            ClassInfo::builder("app/Derived")
                .super_name("app/Base")
                .method(
                    MethodMember::new("run", "(Lapp/Base;)V")
                        .with_variable(LocalVariable::new("this", "Lapp/Derived;", 0))
                        .with_variable(LocalVariable::new("other", "Lapp/Base;", 1)),
                )
                .build(),
        )
        .class(
            ClassInfo::builder("app/Util")
                .super_name("java/lang/Object")
                .field(FieldMember::new("base", "Lapp/Base;"))
                .build(),
        )
        .version(9)
        .versioned_class(9, ClassInfo::builder("app/Base").super_name("java/lang/Object").build())
        .build();
    let runtime = Resource::builder("rt.jar")
        .class(ClassInfo::builder("java/lang/Object").build())
        .build();
    Arc::new(Workspace::with_supporting(primary, vec![runtime]))
}

fn simple(text: &str) -> Result<IntermediateMappings> {
    Ok(SimpleFormat.parse(text)?)
}

#[test]
fn test_empty_mappings_change_nothing() -> Result<()> {
    let workspace = workspace();
    let before = WorkspaceManifest::from_workspace(&workspace);

    let applier = MappingApplier::new(4)?;
    let report = applier.apply(&EmptyMappings, workspace.primary())?;

    assert!(report.renamed.is_empty());
    assert!(report.is_clean());
    assert_eq!(WorkspaceManifest::from_workspace(&workspace), before);
    Ok(())
}

#[test]
fn test_rename_updates_workspace_and_graph() -> Result<()> {
    let workspace = workspace();
    let graph = InheritanceGraph::new(workspace.clone());
    let mappings = simple("app/Base app/Root\n")?;

    let report = MappingApplier::new(2)?.apply(&mappings, workspace.primary())?;
    assert_eq!(report.renamed.len(), 1);
    assert!(report.renamed.contains("app/Base"));

    assert!(workspace.find_any_class("app/Base").is_none());
    let root = workspace.find_any_class("app/Root").expect("renamed class");
    assert!(root.class().method("run", "(Lapp/Root;)V").is_some());

    let derived = workspace.find_any_class("app/Derived").expect("subclass");
    assert_eq!(derived.class().super_name(), Some("app/Root"));
    let util = workspace.find_any_class("app/Util").expect("user");
    assert_eq!(util.class().field("base", "Lapp/Root;").map(|f| f.name.as_str()), Some("base"));

    // The version-scoped copy is renamed too
    let versioned = workspace.primary().versioned_bundle(9).expect("bundle");
    assert_eq!(versioned.names(), vec!["app/Root"]);

    assert!(graph.vertex("app/Base").is_none());
    assert_eq!(graph.direct_children("app/Root"), vec!["app/Derived"]);
    assert_eq!(graph.common_ancestor("app/Derived", "app/Root"), "app/Root");
    Ok(())
}

#[test]
fn test_chained_renames() -> Result<()> {
    let workspace = workspace();
    let mappings = simple("app/Base app/Derived\napp/Derived app/Leaf\n")?;

    let results = MappingApplier::new(3)?.compute(&mappings, workspace.primary())?;
    let mapped = results.mapped_classes();
    assert_eq!(mapped.get("app/Base").map(String::as_str), Some("app/Derived"));
    assert_eq!(mapped.get("app/Derived").map(String::as_str), Some("app/Leaf"));
    assert!(!results.is_committed());

    results.apply()?;
    let classes = workspace.primary().classes();
    assert!(!classes.contains("app/Base"));

    // Former Base now lives under Derived, former Derived under Leaf
    let middle = classes.get("app/Derived").expect("former base");
    assert!(middle.field("count", "I").is_some());
    let leaf = classes.get("app/Leaf").expect("former derived");
    assert_eq!(leaf.super_name(), Some("app/Derived"));
    Ok(())
}

#[test]
fn test_hierarchy_lookup_renames_overrides() -> Result<()> {
    let workspace = workspace();
    let graph = Arc::new(InheritanceGraph::new(workspace.clone()));
    let mappings = simple("app/Base.run(Lapp/Base;)V execute\napp/Base.count I total\n")?;

    // Exact owner only: the override keeps its name
    let flat = MappingApplier::new(2)?.compute(&mappings, workspace.primary())?;
    let derived = flat.post_mapping_class("app/Derived");
    assert!(derived.is_none());

    let hierarchy = HierarchyMappings::new(mappings, graph);
    assert_eq!(
        hierarchy.mapped_method_name("app/Derived", "run", "(Lapp/Base;)V").as_deref(),
        Some("execute")
    );
    let report = MappingApplier::new(2)?.apply(&hierarchy, workspace.primary())?;
    assert!(report.renamed.is_empty());

    let classes = workspace.primary().classes();
    let derived = classes.get("app/Derived").expect("derived");
    let method = derived.method("execute", "(Lapp/Base;)V").expect("renamed override");
    assert_eq!(method.variables.len(), 2);
    assert!(classes.get("app/Base").expect("base").field("total", "I").is_some());
    Ok(())
}

#[test]
fn test_colliding_targets_commit_nothing() -> Result<()> {
    let workspace = workspace();
    let before = WorkspaceManifest::from_workspace(&workspace);
    let applier = MappingApplier::new(2)?;

    let both = simple("app/Base app/Same\napp/Util app/Same\n")?;
    let err = applier.apply(&both, workspace.primary()).unwrap_err();
    assert!(matches!(err, Error::MappingConflict(_)));

    let taken = simple("app/Util app/Derived\n")?;
    let err = applier.apply(&taken, workspace.primary()).unwrap_err();
    assert!(matches!(err, Error::MappingConflict(_)));

    assert_eq!(WorkspaceManifest::from_workspace(&workspace), before);
    Ok(())
}

struct Fussy;

impl ClassRemapper for Fussy {
    fn remap(&self, class: &ClassInfo, mappings: &dyn Mappings) -> bytegraph::Result<ClassInfo> {
        match class.name() {
            "app/Util" => Err(Error::Rewrite {
                class: class.name().to_string(),
                message: "unsupported".to_string(),
            }),
            "app/Derived" => panic!("remapper bug"),
            _ => StructuralRemapper.remap(class, mappings),
        }
    }
}

#[test]
fn test_failed_classes_are_left_alone() -> Result<()> {
    let workspace = workspace();
    let mappings = simple("app/Base app/Root\n")?;

    let applier = MappingApplier::new(2)?.with_remapper(Fussy);
    let report = applier.apply(&mappings, workspace.primary())?;

    assert!(!report.is_clean());
    let mut failed: Vec<&str> = report.failures.iter().map(|f| f.class.as_str()).collect();
    failed.sort();
    assert_eq!(failed, vec!["app/Derived", "app/Util"]);
    assert!(report.failures.iter().any(|f| f.message.contains("remapper bug")));

    let classes = workspace.primary().classes();
    assert!(classes.contains("app/Root"));
    // Untouched, so still pointing at the old name
    assert_eq!(
        classes.get("app/Derived").expect("derived").super_name(),
        Some("app/Base")
    );
    Ok(())
}

#[test]
fn test_mapped_workspace_snapshot() -> Result<()> {
    let workspace = workspace();
    let mappings = simple("app/Util app/Helper\n")?;
    MappingApplier::new(1)?.apply(&mappings, workspace.primary())?;

    let json = WorkspaceManifest::from_workspace(&workspace).to_json()?;
    let reloaded = WorkspaceManifest::from_json(&json)?.into_workspace();
    assert!(reloaded.find_primary_class("app/Helper").is_some());
    assert!(reloaded.find_primary_class("app/Util").is_none());
    assert!(reloaded.find_any_class("java/lang/Object").is_some());
    Ok(())
}
