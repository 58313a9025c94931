//! 点分名称层级索引
//!
//! 每个命名空间（已安装 / 已保存）各持有一个 `HierarchyIndex`。
//! 节点存放在 arena 中，通过 `NodeId` 引用；子节点是句柄列表，
//! 父节点引用只用于路径重建和删除。
//!
//! 字典只登记内部节点（名称前缀），叶子节点只能经由父节点的子列表到达。

mod installed;

#[cfg(test)]
mod tests;

use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;

use crate::name;
use crate::record::PropertyRecord;

pub use installed::{PROPERTY_GROUP_SEGMENT, SYSTEM_LEAVES_ROOT, SYSTEM_ROOT};

/// 节点句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// 名称树节点
#[derive(Debug, Clone)]
pub struct NameNode {
    /// 名称最后一段（未装饰）
    segment: String,
    /// 人类可读标签，显示为 `Segment (Label)`
    label: Option<String>,
    /// 完整路径，同时是字典键
    tag: Option<String>,
    children: Vec<NodeId>,
    /// 叶子节点携带的记录
    payload: Option<PropertyRecord>,
    parent: Option<NodeId>,
}

impl NameNode {
    fn new(segment: &str, label: Option<&str>, tag: Option<&str>, parent: Option<NodeId>) -> Self {
        NameNode {
            segment: segment.to_string(),
            label: label.filter(|l| !l.is_empty()).map(str::to_string),
            tag: tag.map(str::to_string),
            children: Vec::new(),
            payload: None,
            parent,
        }
    }

    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// 显示文本：有标签时为 `Segment (Label)`
    pub fn display_name(&self) -> String {
        match &self.label {
            Some(label) => format!("{} ({})", self.segment, label),
            None => self.segment.clone(),
        }
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn payload(&self) -> Option<&PropertyRecord> {
        self.payload.as_ref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// 结构快照，用于比较两棵树是否等价
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexSnapshot {
    /// 字典中的内部节点路径
    pub interior: BTreeSet<String>,
    /// 叶子记录的规范名称
    pub leaves: BTreeSet<String>,
}

/// 单个命名空间的名称森林
#[derive(Debug, Clone, Default)]
pub struct HierarchyIndex {
    nodes: Vec<Option<NameNode>>,
    free: Vec<usize>,
    /// 内部节点字典：路径 -> 节点
    parents: HashMap<String, NodeId>,
    roots: Vec<NodeId>,
    /// 从 System 根下摘出的 PropGroup 子树
    property_groups: Option<NodeId>,
}

impl HierarchyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从记录序列构建森林
    ///
    /// # 参数
    /// * `records` - 记录序列，每条记录的名称都必须包含 `.`
    /// * `is_installed` - 是否为已安装命名空间（会对 System 根做一次结构调整）
    pub fn populate<I>(records: I, is_installed: bool) -> Self
    where
        I: IntoIterator<Item = PropertyRecord>,
    {
        let mut index = HierarchyIndex::new();

        for record in records {
            index.add(record);
        }

        if is_installed {
            index.rewrite_system_roots();
        }

        tracing::debug!(
            "名称索引构建完成: {} 个根, {} 个内部节点, 已安装: {}",
            index.roots.len(),
            index.parents.len(),
            is_installed
        );

        index
    }

    /// 添加一条记录，返回叶子节点
    ///
    /// 从记录名称向根方向递归，沿途补齐缺失的内部节点，直到接上已有的树。
    pub fn add(&mut self, record: PropertyRecord) -> NodeId {
        debug_assert!(
            record.canonical_name.contains('.'),
            "property name without a parent segment: {}",
            record.canonical_name
        );

        let label = record.display_name.clone();
        let id = self.add_inner(&record.canonical_name, label.as_deref());
        if let Some(node) = self.node_mut(id) {
            node.payload = Some(record);
        }
        id
    }

    fn add_inner(&mut self, name: &str, label: Option<&str>) -> NodeId {
        match name::parent_path(name) {
            Some(parent_name) => {
                let parent = match self.parents.get(parent_name) {
                    Some(&id) => id,
                    None => {
                        let id = self.add_inner(parent_name, None);
                        self.parents.insert(parent_name.to_string(), id);
                        id
                    }
                };

                let node = NameNode::new(name::last_segment(name), label, Some(name), Some(parent));
                let id = self.alloc(node);
                if let Some(parent) = self.node_mut(parent) {
                    parent.children.push(id);
                }
                id
            }
            None => {
                if let Some(&id) = self.parents.get(name) {
                    return id;
                }
                let id = self.alloc(NameNode::new(name, None, Some(name), None));
                self.roots.push(id);
                id
            }
        }
    }

    /// 查找节点
    ///
    /// 名称是内部节点路径时返回该内部节点，否则返回记录名称匹配的叶子。
    pub fn find(&self, canonical_name: &str) -> Option<NodeId> {
        if let Some(&id) = self.parents.get(canonical_name) {
            return Some(id);
        }

        let direct = name::parent_path(canonical_name)
            .and_then(|parent| self.parents.get(parent))
            .and_then(|&parent| self.leaf_among(self.children(parent), canonical_name));

        // 已安装树的 System.* 叶子不在字典父节点下，需要全树查找
        direct.or_else(|| self.search(&self.roots, canonical_name))
    }

    fn leaf_among(&self, items: &[NodeId], canonical_name: &str) -> Option<NodeId> {
        items.iter().copied().find(|&id| {
            self.node(id)
                .and_then(NameNode::payload)
                .is_some_and(|record| record.canonical_name == canonical_name)
        })
    }

    fn search(&self, items: &[NodeId], canonical_name: &str) -> Option<NodeId> {
        for &id in items {
            let Some(node) = self.node(id) else { continue };
            if node.is_leaf() {
                if node.payload().is_some_and(|r| r.canonical_name == canonical_name) {
                    return Some(id);
                }
            } else if let Some(found) = self.search(&node.children, canonical_name) {
                return Some(found);
            }
        }
        None
    }

    /// 按名称取叶子记录
    pub fn record(&self, canonical_name: &str) -> Option<&PropertyRecord> {
        self.find(canonical_name)
            .and_then(|id| self.node(id))
            .and_then(NameNode::payload)
            .filter(|record| record.canonical_name == canonical_name)
    }

    /// 是否包含该名称的叶子记录
    pub fn contains(&self, canonical_name: &str) -> bool {
        self.record(canonical_name).is_some()
    }

    /// 原地替换叶子记录（名称不变），同步更新显示标签
    ///
    /// 返回是否找到了该叶子。
    pub fn update_record(&mut self, record: PropertyRecord) -> bool {
        let Some(id) = self.find(&record.canonical_name) else {
            return false;
        };
        match self.node_mut(id) {
            Some(node) if node.payload.is_some() => {
                node.label = record.display_name.clone().filter(|l| !l.is_empty());
                node.payload = Some(record);
                true
            }
            _ => false,
        }
    }

    /// 候选名称是否与本森林中的已有名称冲突
    ///
    /// # 规则
    /// - 编辑器模式：只有改变已有节点的叶子/内部性质时才算冲突
    /// - 已安装模式：任意一段匹配即冲突
    pub fn name_would_clash(&self, candidate: &str, editor_mode: bool) -> bool {
        self.clash_inner(candidate, &self.roots, editor_mode)
    }

    fn clash_inner(&self, name: &str, items: &[NodeId], editor_mode: bool) -> bool {
        let (part, remainder) = name::first_segment(name);
        let Some(node) = items
            .iter()
            .filter_map(|&id| self.node(id))
            .find(|node| node.segment == part)
        else {
            return false;
        };

        if !editor_mode {
            return true;
        }

        let has_children = !node.children.is_empty();
        // 父节点变叶子，或叶子变父节点
        if (has_children && remainder.is_empty()) || (!has_children && !remainder.is_empty()) {
            return true;
        }

        has_children && self.clash_inner(remainder, &node.children, editor_mode)
    }

    /// 删除名称对应的叶子
    ///
    /// 删除后变空的父节点一并删除（同时移出字典），一直向上直到仍有子节点的祖先。
    /// 名称不存在时什么也不做，返回 `false`。
    pub fn remove(&mut self, canonical_name: &str) -> bool {
        let roots = self.roots.clone();
        let removed = self.remove_inner(None, &roots, canonical_name);
        if removed {
            tracing::debug!("已从名称索引移除: {}", canonical_name);
        }
        removed
    }

    fn remove_inner(&mut self, owner: Option<NodeId>, items: &[NodeId], canonical_name: &str) -> bool {
        let mut to_remove = None;

        for &id in items {
            let Some(node) = self.node(id) else { continue };

            if node.is_leaf() {
                if node.payload().is_some_and(|r| r.canonical_name == canonical_name) {
                    to_remove = Some(id);
                    break;
                }
                continue;
            }

            let children = node.children.clone();
            if self.remove_inner(Some(id), &children, canonical_name) {
                if !self.children(id).is_empty() {
                    return true;
                }
                // 父节点已空，移出字典后一并删除
                if let Some(tag) = self.node(id).and_then(|n| n.tag.clone()) {
                    if self.parents.get(&tag) == Some(&id) {
                        self.parents.remove(&tag);
                    }
                }
                to_remove = Some(id);
                break;
            }
        }

        match to_remove {
            Some(id) => {
                self.detach(owner, id);
                self.release(id);
                true
            }
            None => false,
        }
    }

    /// 节点下的全部叶子记录；节点本身是叶子时返回它自己
    pub fn leaves_under(&self, id: NodeId) -> Vec<&PropertyRecord> {
        let mut out = Vec::new();
        self.collect_leaves(id, &mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, id: NodeId, out: &mut Vec<&'a PropertyRecord>) {
        let Some(node) = self.node(id) else { return };
        if node.is_leaf() {
            if let Some(record) = node.payload() {
                out.push(record);
            }
            return;
        }
        for &child in &node.children {
            self.collect_leaves(child, out);
        }
    }

    /// 森林中全部叶子记录（按树的顺序）
    pub fn records(&self) -> Vec<&PropertyRecord> {
        let mut out = Vec::new();
        for &root in &self.roots {
            self.collect_leaves(root, &mut out);
        }
        out
    }

    /// 节点的完整路径
    pub fn path(&self, id: NodeId) -> Option<String> {
        let node = self.node(id)?;
        if let Some(tag) = &node.tag {
            return Some(tag.clone());
        }
        match node.parent {
            Some(parent) => Some(name::join(self.path(parent).as_deref(), &node.segment)),
            None => Some(node.segment.clone()),
        }
    }

    /// 结构快照：字典键集合 + 叶子名称集合
    pub fn snapshot(&self) -> IndexSnapshot {
        IndexSnapshot {
            interior: self.parents.keys().cloned().collect(),
            leaves: self
                .records()
                .into_iter()
                .map(|record| record.canonical_name.clone())
                .collect(),
        }
    }

    /// 缩进文本形式的树，供被动视图直接显示
    pub fn outline(&self) -> String {
        let mut out = String::new();
        for &root in &self.roots {
            self.outline_node(root, 0, &mut out);
        }
        out
    }

    fn outline_node(&self, id: NodeId, depth: usize, out: &mut String) {
        let Some(node) = self.node(id) else { return };
        let _ = writeln!(out, "{}{}", "  ".repeat(depth), node.display_name());
        for &child in &node.children {
            self.outline_node(child, depth + 1, out);
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&NameNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut NameNode> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(NameNode::children).unwrap_or(&[])
    }

    /// 字典中的内部节点
    pub fn parent_node(&self, path: &str) -> Option<NodeId> {
        self.parents.get(path).copied()
    }

    /// 已摘出的 PropGroup 子树（仅已安装命名空间）
    pub fn property_groups(&self) -> Option<NodeId> {
        self.property_groups
    }

    /// 叶子记录数量
    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    fn alloc(&mut self, node: NameNode) -> NodeId {
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                NodeId(slot)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        if let Some(slot) = self.nodes.get_mut(id.0) {
            if slot.take().is_some() {
                self.free.push(id.0);
            }
        }
    }

    /// 从所属集合（根序列或父节点子列表）中摘下节点
    fn detach(&mut self, owner: Option<NodeId>, id: NodeId) {
        match owner {
            Some(owner) => {
                if let Some(node) = self.node_mut(owner) {
                    node.children.retain(|&child| child != id);
                }
            }
            None => self.roots.retain(|&root| root != id),
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
        }
    }

    fn attach(&mut self, owner: NodeId, id: NodeId) {
        if let Some(node) = self.node_mut(owner) {
            node.children.push(id);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = Some(owner);
        }
    }
}
