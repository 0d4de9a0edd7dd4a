use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use models::{is_valid_identifier, Scene, SceneObject};

use crate::Error;

/// An indexed view over a [`Scene`]. Owns its state: the input is
/// consumed at construction and [`CachedScene::snapshot`] produces a
/// fresh, equivalent `Scene` on demand.
#[derive(Debug, Clone)]
pub struct CachedScene {
    pub id: String,
    pub name: String,
    pub description: String,
    pub modified: Option<DateTime<Utc>>,
    int_modified: Option<DateTime<Utc>>,

    objects: IndexMap<String, SceneObject>,
}

impl CachedScene {
    pub fn new(scene: Scene) -> Result<Self, Error> {
        let Scene {
            id,
            name,
            description,
            modified,
            int_modified,
            objects,
        } = scene;

        let mut cached = CachedScene {
            id,
            name,
            description,
            modified,
            int_modified,
            objects: IndexMap::with_capacity(objects.len()),
        };

        for obj in objects {
            cached.check_object(&obj)?;
            cached.objects.insert(obj.id.clone(), obj);
        }

        Ok(cached)
    }

    fn check_object(&self, obj: &SceneObject) -> Result<(), Error> {
        if !is_valid_identifier(&obj.name) {
            return Err(Error::InvalidIdentifier {
                kind: "object",
                name: obj.name.clone(),
            });
        }
        if self.objects.contains_key(&obj.id) {
            return Err(Error::duplicate_id("object", &obj.id));
        }
        if self.objects.values().any(|o| o.name == obj.name) {
            return Err(Error::duplicate_name("object", &obj.name));
        }
        Ok(())
    }

    pub fn object(&self, object_id: &str) -> Result<&SceneObject, Error> {
        self.objects
            .get(object_id)
            .ok_or_else(|| Error::not_found("object", object_id))
    }

    pub fn objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.values()
    }

    pub fn object_ids(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }

    pub fn object_names(&self) -> impl Iterator<Item = &str> {
        self.objects.values().map(|o| o.name.as_str())
    }

    pub fn objects_of_type<'s>(&'s self, type_: &'s str) -> impl Iterator<Item = &'s SceneObject> {
        self.objects.values().filter(move |o| o.type_ == type_)
    }

    /// The scene without its objects.
    pub fn bare(&self) -> Scene {
        Scene {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            ..Scene::default()
        }
    }

    /// A fresh `Scene` reflecting the current state.
    pub fn snapshot(&self) -> Scene {
        let mut scene = self.bare();
        scene.modified = self.modified;
        scene.int_modified = self.int_modified;
        scene.objects = self.objects.values().cloned().collect();
        scene
    }

    fn update_modified(&mut self) {
        // Strictly monotonic, even when mutations land within the clock
        // resolution.
        let now = Utc::now();
        self.int_modified = Some(match self.int_modified {
            Some(prev) if prev >= now => prev + chrono::Duration::microseconds(1),
            _ => now,
        });
    }

    /// Whether in-memory changes are newer than the persisted state.
    pub fn has_changes(&self) -> bool {
        match (self.int_modified, self.modified) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(int), Some(modified)) => int > modified,
        }
    }

    pub fn upsert_object(&mut self, obj: SceneObject) -> Result<(), Error> {
        match self.objects.get(&obj.id) {
            Some(_) => {
                // Replacing: the name may collide only with itself.
                if !is_valid_identifier(&obj.name) {
                    return Err(Error::InvalidIdentifier {
                        kind: "object",
                        name: obj.name,
                    });
                }
                if self
                    .objects
                    .values()
                    .any(|o| o.name == obj.name && o.id != obj.id)
                {
                    return Err(Error::duplicate_name("object", &obj.name));
                }
            }
            None => self.check_object(&obj)?,
        }

        tracing::debug!(object = %obj.id, "upsert scene object");
        self.objects.insert(obj.id.clone(), obj);
        self.update_modified();
        Ok(())
    }

    pub fn remove_object(&mut self, object_id: &str) -> Result<SceneObject, Error> {
        let removed = self
            .objects
            .shift_remove(object_id)
            .ok_or_else(|| Error::not_found("object", object_id))?;
        self.update_modified();
        Ok(removed)
    }
}
