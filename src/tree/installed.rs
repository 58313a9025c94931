//! 已安装命名空间的结构调整
//!
//! System 根下的叶子移到合成根 `System.*`，PropGroup 子树摘出单独保存，
//! 两个 System 根固定排在最前面。字典不受影响。

use super::{HierarchyIndex, NameNode, NodeId};

/// 系统属性根
pub const SYSTEM_ROOT: &str = "System";
/// 收纳 System 直属叶子的合成根
pub const SYSTEM_LEAVES_ROOT: &str = "System.*";
/// 属性分组节点
pub const PROPERTY_GROUP_SEGMENT: &str = "PropGroup";

impl HierarchyIndex {
    pub(super) fn rewrite_system_roots(&mut self) {
        let Some(system) = self.root_named(SYSTEM_ROOT) else {
            return;
        };

        let prop_group = self
            .children(system)
            .iter()
            .copied()
            .find(|&id| self.node(id).is_some_and(|n| n.segment() == PROPERTY_GROUP_SEGMENT));
        if let Some(prop_group) = prop_group {
            self.detach(Some(system), prop_group);
            self.property_groups = Some(prop_group);
        }

        let star = self.alloc(NameNode::new(SYSTEM_LEAVES_ROOT, None, None, None));
        let leaves: Vec<NodeId> = self
            .children(system)
            .iter()
            .copied()
            .filter(|&id| self.node(id).is_some_and(NameNode::is_leaf))
            .collect();
        for leaf in &leaves {
            self.detach(Some(system), *leaf);
            self.attach(star, *leaf);
        }

        // System.*, System, 其余保持发现顺序
        self.roots.retain(|&id| id != system);
        self.roots.insert(0, system);
        self.roots.insert(0, star);

        tracing::debug!(
            "已安装命名空间调整: {} 个系统叶子移入 {}, PropGroup: {}",
            leaves.len(),
            SYSTEM_LEAVES_ROOT,
            self.property_groups.is_some()
        );
    }

    fn root_named(&self, segment: &str) -> Option<NodeId> {
        self.roots
            .iter()
            .copied()
            .find(|&id| self.node(id).is_some_and(|n| n.segment() == segment))
    }
}
