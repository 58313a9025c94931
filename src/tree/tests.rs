use super::*;
use proptest::prelude::*;

fn records(names: &[&str]) -> Vec<PropertyRecord> {
    names.iter().map(|name| PropertyRecord::new(*name)).collect()
}

/// 子节点的段名列表
fn child_segments(index: &HierarchyIndex, id: NodeId) -> Vec<String> {
    index
        .children(id)
        .iter()
        .filter_map(|&child| index.node(child))
        .map(|node| node.segment().to_string())
        .collect()
}

fn root_segments(index: &HierarchyIndex) -> Vec<String> {
    index
        .roots()
        .iter()
        .filter_map(|&id| index.node(id))
        .map(|node| node.segment().to_string())
        .collect()
}

#[test]
fn test_populate_builds_forest() {
    let index = HierarchyIndex::populate(records(&["Sys.Title", "Sys.Size", "Vendor.App.Field"]), false);

    assert_eq!(root_segments(&index), vec!["Sys", "Vendor"]);

    let sys = index.parent_node("Sys").unwrap();
    assert_eq!(child_segments(&index, sys), vec!["Title", "Size"]);
    assert!(index.children(sys).iter().all(|&id| index.node(id).unwrap().is_leaf()));

    let vendor = index.parent_node("Vendor").unwrap();
    assert_eq!(child_segments(&index, vendor), vec!["App"]);
    let app = index.parent_node("Vendor.App").unwrap();
    assert_eq!(child_segments(&index, app), vec!["Field"]);

    // 叶子不进字典
    assert!(index.parent_node("Sys.Title").is_none());
    assert!(index.parent_node("Vendor.App.Field").is_none());
    assert_eq!(index.len(), 3);
}

#[test]
fn test_leaf_label_decoration() {
    let mut record = PropertyRecord::new("Vendor.App.Field");
    record.display_name = Some("My Field".to_string());
    let mut index = HierarchyIndex::new();
    let id = index.add(record);

    let node = index.node(id).unwrap();
    assert_eq!(node.segment(), "Field");
    assert_eq!(node.display_name(), "Field (My Field)");
    assert_eq!(node.tag(), Some("Vendor.App.Field"));
    assert_eq!(index.path(id).as_deref(), Some("Vendor.App.Field"));
}

#[test]
fn test_find_interior_and_leaf() {
    let index = HierarchyIndex::populate(records(&["A.B.C", "A.D"]), false);

    let interior = index.find("A.B").unwrap();
    assert_eq!(index.node(interior).unwrap().segment(), "B");
    assert!(!index.node(interior).unwrap().is_leaf());

    let leaf = index.find("A.B.C").unwrap();
    assert_eq!(
        index.node(leaf).unwrap().payload().unwrap().canonical_name,
        "A.B.C"
    );

    assert!(index.find("A.B.X").is_none());
    assert!(index.find("Nope.X").is_none());
    assert!(index.contains("A.D"));
    assert!(!index.contains("A.B"));
}

#[test]
fn test_clash_editor_mode() {
    let empty = HierarchyIndex::new();
    assert!(!empty.name_would_clash("A.B", true));

    // 已有叶子 Q.A，候选 Q.A.B 会把叶子变成父节点
    let index = HierarchyIndex::populate(records(&["Q.A"]), false);
    assert!(index.name_would_clash("Q.A.B", true));
    // 同名记录不是冲突
    assert!(!index.name_would_clash("Q.A", true));
    // 新的兄弟节点不是冲突
    assert!(!index.name_would_clash("Q.Z", true));

    // 已有内部节 A.B，候选 A.B 会把父节点变成叶子
    let index = HierarchyIndex::populate(records(&["A.B.C"]), false);
    assert!(index.name_would_clash("A.B", true));
    assert!(index.name_would_clash("A", true));
    assert!(!index.name_would_clash("A.B.D", true));
}

#[test]
fn test_clash_installed_mode() {
    let index = HierarchyIndex::populate(records(&["A.B"]), false);

    assert!(index.name_would_clash("A.B", false));
    assert!(index.name_would_clash("A.Other", false));
    assert!(!index.name_would_clash("Other.B", false));
}

#[test]
fn test_clash_uses_raw_segment() {
    let mut record = PropertyRecord::new("A.B");
    record.display_name = Some("Label".to_string());
    let index = HierarchyIndex::populate(vec![record], false);

    assert!(index.name_would_clash("A.B.C", true));
}

#[test]
fn test_remove_collapses_empty_ancestors() {
    let mut index = HierarchyIndex::populate(records(&["A.B.C.D", "A.X"]), false);

    assert!(index.remove("A.B.C.D"));

    assert!(index.parent_node("A.B.C").is_none());
    assert!(index.parent_node("A.B").is_none());
    let a = index.parent_node("A").unwrap();
    assert_eq!(child_segments(&index, a), vec!["X"]);
    assert_eq!(root_segments(&index), vec!["A"]);
}

#[test]
fn test_remove_last_leaf_removes_root() {
    let mut index = HierarchyIndex::populate(records(&["A.B", "C.D"]), false);

    assert!(index.remove("A.B"));
    assert!(index.parent_node("A").is_none());
    assert_eq!(root_segments(&index), vec!["C"]);
}

#[test]
fn test_remove_keeps_populated_siblings() {
    let mut index = HierarchyIndex::populate(records(&["A.B.C", "A.B.D"]), false);

    assert!(index.remove("A.B.C"));
    let b = index.parent_node("A.B").unwrap();
    assert_eq!(child_segments(&index, b), vec!["D"]);
}

#[test]
fn test_remove_missing_is_noop() {
    let mut index = HierarchyIndex::populate(records(&["A.B"]), false);
    let before = index.snapshot();

    assert!(!index.remove("A.C"));
    assert!(!index.remove("Z.Z"));
    assert_eq!(index.snapshot(), before);
}

#[test]
fn test_update_record_relabels_leaf() {
    let mut index = HierarchyIndex::populate(records(&["A.B"]), false);

    let mut record = PropertyRecord::new("A.B");
    record.display_name = Some("Bee".to_string());
    assert!(index.update_record(record));

    let id = index.find("A.B").unwrap();
    assert_eq!(index.node(id).unwrap().display_name(), "B (Bee)");
    assert!(!index.update_record(PropertyRecord::new("A.Missing")));
}

#[test]
fn test_leaves_under_interior_node() {
    let index = HierarchyIndex::populate(records(&["A.B.C", "A.B.D", "A.E"]), false);

    let a = index.parent_node("A").unwrap();
    let names: Vec<&str> = index
        .leaves_under(a)
        .into_iter()
        .map(|r| r.canonical_name.as_str())
        .collect();
    assert_eq!(names, vec!["A.B.C", "A.B.D", "A.E"]);

    let leaf = index.find("A.E").unwrap();
    assert_eq!(index.leaves_under(leaf).len(), 1);
}

#[test]
fn test_installed_rewrite() {
    let index = HierarchyIndex::populate(
        records(&[
            "Vendor.App.Field",
            "System.PropGroup.Description",
            "System.Title",
            "System.Author",
        ]),
        true,
    );

    assert_eq!(root_segments(&index), vec!["System.*", "System", "Vendor"]);

    let star = index.roots()[0];
    assert_eq!(child_segments(&index, star), vec!["Title", "Author"]);

    // PropGroup 已摘出，System 保留为空根
    let system = index.roots()[1];
    assert!(index.children(system).is_empty());
    let groups = index.property_groups().unwrap();
    assert_eq!(index.node(groups).unwrap().segment(), "PropGroup");

    // 字典不变，叶子仍可查找
    assert!(index.parent_node("System").is_some());
    assert!(index.parent_node("System.PropGroup").is_some());
    assert!(index.find("System.Title").is_some());
    assert!(index.name_would_clash("System.Title", false));
}

#[test]
fn test_installed_rewrite_keeps_nested_system_nodes() {
    let index = HierarchyIndex::populate(
        records(&["System.Music.Artist", "System.Title"]),
        true,
    );

    let system = index.roots()[1];
    assert_eq!(child_segments(&index, system), vec!["Music"]);
    let star = index.roots()[0];
    assert_eq!(child_segments(&index, star), vec!["Title"]);
}

#[test]
fn test_installed_rewrite_without_system_root() {
    let index = HierarchyIndex::populate(records(&["Vendor.A", "Other.B"]), true);

    assert_eq!(root_segments(&index), vec!["Vendor", "Other"]);
    assert!(index.property_groups().is_none());
}

#[test]
fn test_remove_from_system_leaves_root() {
    let mut index = HierarchyIndex::populate(records(&["System.Title", "Vendor.A"]), true);

    assert!(index.remove("System.Title"));
    assert!(index.find("System.Title").is_none());
    assert_eq!(root_segments(&index), vec!["System", "Vendor"]);
}

#[test]
fn test_outline() {
    let mut record = PropertyRecord::new("A.B");
    record.display_name = Some("Bee".to_string());
    let index = HierarchyIndex::populate(vec![record, PropertyRecord::new("A.C.D")], false);

    assert_eq!(index.outline(), "A\n  B (Bee)\n  C\n    D\n");
}

fn name_set() -> impl Strategy<Value = Vec<String>> {
    let segment = prop::sample::select(vec!["A", "B", "C", "Dd", "Ee"]);
    let name = prop::collection::vec(segment, 2..5).prop_map(|parts| parts.join("."));
    prop::collection::btree_set(name, 1..12).prop_map(|set| set.into_iter().collect())
}

/// 同一组名称中，叶子名称不能是另一个名称的前缀
fn prefix_free(names: Vec<String>) -> Vec<String> {
    let all = names.clone();
    names
        .into_iter()
        .filter(|name| !all.iter().any(|other| other.starts_with(&format!("{}.", name))))
        .collect()
}

proptest! {
    #[test]
    fn prop_populate_is_order_independent(
        (names, shuffled) in name_set()
            .prop_map(prefix_free)
            .prop_flat_map(|names| (Just(names.clone()), Just(names).prop_shuffle()))
    ) {
        let first = HierarchyIndex::populate(names.iter().map(PropertyRecord::new), false);
        let second = HierarchyIndex::populate(shuffled.iter().map(PropertyRecord::new), false);

        prop_assert_eq!(first.snapshot(), second.snapshot());
    }

    #[test]
    fn prop_remove_then_add_restores_tree(
        (names, pick) in name_set()
            .prop_map(prefix_free)
            .prop_flat_map(|names| {
                let len = names.len();
                (Just(names), 0..len)
            })
    ) {
        let mut index = HierarchyIndex::populate(names.iter().map(PropertyRecord::new), false);
        let before = index.snapshot();

        prop_assert!(index.remove(&names[pick]));
        prop_assert!(!index.contains(&names[pick]));
        index.add(PropertyRecord::new(names[pick].as_str()));

        prop_assert_eq!(index.snapshot(), before);
    }
}
