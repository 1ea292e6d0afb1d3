//! Per-call working state of one wait

use collector_interface::ObjectRef;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::spec::{PathList, ValueList};
use crate::wire::{scalar_text, UpdateSet};

/// Latest value seen per requested property
pub type PropertyValues = BTreeMap<String, Value>;

/// Where a wait currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Init,
    FilterCreated,
    Polling,
    Terminating,
    Done,
    Failed,
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PollState::Init => "init",
            PollState::FilterCreated => "filter-created",
            PollState::Polling => "polling",
            PollState::Terminating => "terminating",
            PollState::Done => "done",
            PollState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Working state of one wait, owned by exactly one in-flight poll
///
/// Property names are matched by substring: a change to `info.state` counts
/// for a requested `state`. This also means unrelated properties sharing a
/// substring with a requested path are recorded.
#[derive(Debug)]
pub struct WaitTarget {
    target: ObjectRef,
    filter_props: PathList,
    end_wait_props: PathList,
    expected_vals: Vec<String>,
    end_wait_values: PropertyValues,
    filter_values: PropertyValues,
    version: String,
    found: bool,
    trail: Vec<PollState>,
}

impl WaitTarget {
    pub fn new(
        target: ObjectRef,
        filter_props: PathList,
        end_wait_props: PathList,
        expected_vals: ValueList,
    ) -> Self {
        Self {
            target,
            filter_props,
            end_wait_props,
            expected_vals: expected_vals.into_vec(),
            end_wait_values: PropertyValues::new(),
            filter_values: PropertyValues::new(),
            version: String::new(),
            found: false,
            trail: vec![PollState::Init],
        }
    }

    pub fn target(&self) -> &ObjectRef {
        &self.target
    }

    pub fn filter_props(&self) -> &PathList {
        &self.filter_props
    }

    /// Version token to send on the next wait call
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn found(&self) -> bool {
        self.found
    }

    pub fn state(&self) -> PollState {
        self.trail.last().copied().unwrap_or(PollState::Init)
    }

    /// Every state this wait has been in, oldest first
    pub fn trail(&self) -> &[PollState] {
        &self.trail
    }

    pub(crate) fn set_state(&mut self, state: PollState) {
        debug!("Wait on {}: {} -> {}", self.target, self.state(), state);
        self.trail.push(state);
    }

    pub fn filter_values(&self) -> &PropertyValues {
        &self.filter_values
    }

    pub fn into_filter_values(self) -> PropertyValues {
        self.filter_values
    }

    /// Fold one non-empty update set into the accumulators
    ///
    /// The version always advances. Updates addressed to a different filter
    /// are skipped; `filter` is `None` when the caller cannot tell.
    pub fn apply(&mut self, update: &UpdateSet, filter: Option<&ObjectRef>) {
        self.version.clone_from(&update.version);

        let ours = update.filter_set.iter().filter(|f| match (&f.filter, filter) {
            (Some(seen), Some(mine)) => seen == mine,
            _ => true,
        });

        for object in ours.flat_map(|f| f.object_set.iter()) {
            if !object.kind.carries_changes() {
                continue;
            }

            for change in &object.change_set {
                let recorded = change.recorded_value();

                for prop in self.end_wait_props.iter() {
                    if change.name.contains(prop.as_str()) {
                        self.end_wait_values.insert(prop.clone(), recorded.clone());
                    }
                }

                for prop in self.filter_props.iter() {
                    if change.name.contains(prop.as_str()) {
                        self.filter_values.insert(prop.clone(), recorded.clone());
                    }
                }
            }
        }

        self.found = self.found || self.reached_expected();
    }

    fn reached_expected(&self) -> bool {
        self.end_wait_values.values().any(|value| {
            scalar_text(value).is_some_and(|text| self.expected_vals.iter().any(|e| *e == *text))
        })
    }
}
