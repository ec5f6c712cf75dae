/*!
The set of objects known from the previous run
*/

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::DataError;
use crate::object::{SavedObject, TrackedObject};

/// On-disk layout: `{"objects": [{"id", "ps_cum", "ts_max"}, ...]}`.
///
/// Unknown fields are ignored so newer and older files stay readable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub objects: Vec<SavedObject>,
}

impl SnapshotFile {
    /// Reduce freshly fetched objects to what is kept between runs, in fetch order.
    pub fn from_objects(objects: &[TrackedObject]) -> Self {
        Self {
            objects: objects.iter().map(SavedObject::from).collect(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, DataError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, DataError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Previously seen objects keyed by Sentry id.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    objects: HashMap<String, SavedObject>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&SavedObject> {
        self.objects.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.objects.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SavedObject> {
        self.objects.values()
    }
}

impl FromIterator<SavedObject> for Snapshot {
    /// Ids are unique within a snapshot; the first record for an id wins.
    fn from_iter<I: IntoIterator<Item = SavedObject>>(iter: I) -> Self {
        let mut objects = HashMap::new();
        for object in iter {
            objects.entry(object.id.clone()).or_insert(object);
        }
        Self { objects }
    }
}

impl From<SnapshotFile> for Snapshot {
    fn from(file: SnapshotFile) -> Self {
        file.objects.into_iter().collect()
    }
}
