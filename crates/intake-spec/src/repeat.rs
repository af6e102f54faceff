use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::answers::{AnswerKey, AnswerStore, FileAttachments, InstanceId};
use crate::spec::question::QuestionSpec;

/// Instance list of one repeatable family, bounded by `min..=max`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatableGroup {
    pub min: u32,
    pub max: u32,
    pub instances: Vec<InstanceId>,
    /// Next id to hand out; only ever grows.
    #[serde(default)]
    pub next_instance: InstanceId,
}

impl RepeatableGroup {
    fn seeded(min: u32, max: u32) -> Self {
        let count = min.max(1).min(max);
        let instances: Vec<InstanceId> = (1..=count).collect();
        Self {
            min,
            max,
            next_instance: count + 1,
            instances,
        }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn can_add(&self) -> bool {
        self.instances.len() < self.max as usize
    }

    pub fn can_remove(&self) -> bool {
        self.instances.len() > self.min as usize
    }

    pub fn contains(&self, instance: InstanceId) -> bool {
        self.instances.contains(&instance)
    }
}

/// Tracks every repeatable group of a form, plus which instance cards are
/// collapsed in the UI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepeatGroups {
    groups: BTreeMap<String, RepeatableGroup>,
    members: BTreeMap<String, BTreeSet<String>>,
    collapsed: BTreeSet<(String, InstanceId)>,
}

impl RepeatGroups {
    /// Registers a repeatable question; the first one seen for a group
    /// creates the group with its seeded instance.
    pub fn initialize(&mut self, question: &QuestionSpec) {
        let Some(group) = question.repeat_group() else {
            return;
        };
        self.members
            .entry(group.to_string())
            .or_default()
            .insert(question.id.clone());
        if !self.groups.contains_key(group) {
            debug!(group, min = question.min_repeats, max = question.max_repeats, "tracking repeatable group");
            self.groups.insert(
                group.to_string(),
                RepeatableGroup::seeded(question.min_repeats, question.max_repeats),
            );
        }
    }

    /// Replaces a group's instances with ids observed in prefill or draft
    /// data, keeping the bounds: extra ids past `max` are dropped and the
    /// list is topped up to `min` with fresh ids. Ids below `next_floor`
    /// are never handed out again.
    pub fn restore(&mut self, group: &str, observed: &BTreeSet<InstanceId>, next_floor: InstanceId) {
        let Some(entry) = self.groups.get_mut(group) else {
            return;
        };
        let mut instances: Vec<InstanceId> = observed
            .iter()
            .copied()
            .filter(|id| *id > 0)
            .take(entry.max as usize)
            .collect();
        let mut next = instances.last().map_or(1, |last| last + 1).max(next_floor);
        while instances.len() < entry.min as usize {
            instances.push(next);
            next += 1;
        }
        entry.next_instance = next;
        entry.instances = instances;
        let instances = &entry.instances;
        self.collapsed
            .retain(|(name, id)| name != group || instances.contains(id));
        debug!(group, instances = ?entry.instances, "restored repeatable group");
    }

    pub fn get(&self, group: &str) -> Option<&RepeatableGroup> {
        self.groups.get(group)
    }

    /// Instances of `group`, empty when the group is unknown.
    pub fn instances(&self, group: &str) -> &[InstanceId] {
        self.groups
            .get(group)
            .map(|entry| entry.instances.as_slice())
            .unwrap_or(&[])
    }

    pub fn groups(&self) -> &BTreeMap<String, RepeatableGroup> {
        &self.groups
    }

    /// Question ids that belong to `group`.
    pub fn members(&self, group: &str) -> Option<&BTreeSet<String>> {
        self.members.get(group)
    }

    /// Group owning `question`, if it is repeatable.
    pub fn group_of(&self, question: &str) -> Option<&str> {
        self.members
            .iter()
            .find(|(_, ids)| ids.contains(question))
            .map(|(group, _)| group.as_str())
    }

    /// Appends a new instance. Returns false at `max` or for unknown groups.
    pub fn add(&mut self, group: &str) -> bool {
        let Some(entry) = self.groups.get_mut(group) else {
            return false;
        };
        if !entry.can_add() {
            debug!(group, max = entry.max, "add ignored at capacity");
            return false;
        }
        let floor = entry.instances.iter().max().map_or(1, |max| max + 1);
        let id = entry.next_instance.max(floor);
        entry.instances.push(id);
        entry.next_instance = id + 1;
        debug!(group, instance = id, "instance added");
        true
    }

    /// Removes an instance and every answer, attachment and collapse flag
    /// it owned. Returns false at `min` or when the instance is unknown.
    pub fn remove(
        &mut self,
        group: &str,
        instance: InstanceId,
        store: &mut AnswerStore,
        files: &mut FileAttachments,
    ) -> bool {
        let Some(entry) = self.groups.get_mut(group) else {
            return false;
        };
        if !entry.can_remove() || !entry.contains(instance) {
            debug!(group, instance, min = entry.min, "remove ignored");
            return false;
        }
        entry.instances.retain(|id| *id != instance);

        let empty = BTreeSet::new();
        let members = self.members.get(group).unwrap_or(&empty);
        let owned = |key: &AnswerKey| key.instance == Some(instance) && members.contains(&key.question);
        let dropped = store.purge(owned);
        files.purge(owned);
        self.collapsed.remove(&(group.to_string(), instance));
        debug!(group, instance, dropped, "instance removed");
        true
    }

    /// Flips the collapsed flag of an instance card; returns the new state.
    pub fn toggle_collapsed(&mut self, group: &str, instance: InstanceId) -> bool {
        if !self.get(group).is_some_and(|entry| entry.contains(instance)) {
            return false;
        }
        let key = (group.to_string(), instance);
        if self.collapsed.remove(&key) {
            false
        } else {
            self.collapsed.insert(key);
            true
        }
    }

    pub fn is_collapsed(&self, group: &str, instance: InstanceId) -> bool {
        self.collapsed.contains(&(group.to_string(), instance))
    }
}
