//! In-memory backend: six ordered collections behind the same contract as
//! the relational one. When a workspace is available the whole state is
//! mirrored to a JSON file after every mutation, best effort.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::{Class, Grade, GradeFilter, Parent, Student, StudentFilter, Teacher,
    TeacherFilter, User};
use crate::store::{Backend, BackendKind, Snapshot};

/// The snapshot shape: all six collections, nothing else. Import rejects
/// anything that does not carry exactly these keys.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Collections {
    users: Vec<User>,
    students: Vec<Student>,
    teachers: Vec<Teacher>,
    parents: Vec<Parent>,
    classes: Vec<Class>,
    grades: Vec<Grade>,
}

pub(crate) struct MemoryBackend {
    collections: Collections,
    mirror: Option<PathBuf>,
}

impl MemoryBackend {
    #[allow(dead_code)]
    pub fn new() -> Self {
        MemoryBackend {
            collections: Collections::default(),
            mirror: None,
        }
    }

    /// Mirror-backed store: reload the mirror file when present, start empty
    /// when it is missing or unreadable.
    pub fn with_mirror(path: PathBuf) -> Self {
        let collections = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(c) => c,
                Err(e) => {
                    warn!("mirror file {} is not a store snapshot ({e}); starting empty", path.display());
                    Collections::default()
                }
            },
            Err(_) => Collections::default(),
        };
        MemoryBackend {
            collections,
            mirror: Some(path),
        }
    }

    fn flush_mirror(&self) {
        let Some(path) = &self.mirror else {
            return;
        };
        let text = match serde_json::to_string_pretty(&self.collections) {
            Ok(t) => t,
            Err(e) => {
                warn!("mirror serialize failed: {e}");
                return;
            }
        };
        if let Err(e) = std::fs::write(path, text) {
            warn!("mirror write to {} failed: {e}", path.display());
        }
    }
}

fn matches(field: &str, wanted: &Option<String>) -> bool {
    wanted.as_deref().map_or(true, |w| field == w)
}

impl Backend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn insert_user(&mut self, user: &User) -> anyhow::Result<()> {
        self.collections.users.push(user.clone());
        self.flush_mirror();
        Ok(())
    }

    fn find_user(&self, user_id: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .collections
            .users
            .iter()
            .find(|u| u.user_id == user_id)
            .cloned())
    }

    fn find_credentials(&self, user_id: &str, password: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .collections
            .users
            .iter()
            .find(|u| u.user_id == user_id && u.password == password)
            .cloned())
    }

    fn users(&self) -> anyhow::Result<Vec<User>> {
        let mut out = self.collections.users.clone();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    fn insert_student(&mut self, student: &Student) -> anyhow::Result<()> {
        self.collections.students.push(student.clone());
        self.flush_mirror();
        Ok(())
    }

    fn students(&self, filter: &StudentFilter) -> anyhow::Result<Vec<Student>> {
        let mut out: Vec<Student> = self
            .collections
            .students
            .iter()
            .filter(|s| matches(&s.class_id, &filter.class_id) && matches(&s.status, &filter.status))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    fn insert_teacher(&mut self, teacher: &Teacher) -> anyhow::Result<()> {
        self.collections.teachers.push(teacher.clone());
        self.flush_mirror();
        Ok(())
    }

    fn teachers(&self, filter: &TeacherFilter) -> anyhow::Result<Vec<Teacher>> {
        let mut out: Vec<Teacher> = self
            .collections
            .teachers
            .iter()
            .filter(|t| {
                matches(&t.department, &filter.department) && matches(&t.status, &filter.status)
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    fn insert_parent(&mut self, parent: &Parent) -> anyhow::Result<()> {
        self.collections.parents.push(parent.clone());
        self.flush_mirror();
        Ok(())
    }

    fn parents(&self) -> anyhow::Result<Vec<Parent>> {
        let mut out = self.collections.parents.clone();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    fn insert_class(&mut self, class: &Class) -> anyhow::Result<()> {
        self.collections.classes.push(class.clone());
        self.flush_mirror();
        Ok(())
    }

    fn classes(&self) -> anyhow::Result<Vec<Class>> {
        let mut out = self.collections.classes.clone();
        out.sort_by(|a, b| a.class_name.cmp(&b.class_name));
        Ok(out)
    }

    fn insert_grade(&mut self, grade: &Grade) -> anyhow::Result<()> {
        self.collections.grades.push(grade.clone());
        self.flush_mirror();
        Ok(())
    }

    fn grades(&self, filter: &GradeFilter) -> anyhow::Result<Vec<Grade>> {
        let mut out: Vec<Grade> = self
            .collections
            .grades
            .iter()
            .filter(|g| {
                matches(&g.student_id, &filter.student_id)
                    && matches(&g.subject, &filter.subject)
                    && matches(&g.term, &filter.term)
                    && matches(&g.academic_year, &filter.academic_year)
            })
            .cloned()
            .collect();
        // Newest first; the reverse keeps later insertions ahead when
        // timestamps collide (the sort below is stable).
        out.reverse();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    fn export(&self) -> anyhow::Result<Snapshot> {
        Ok(Snapshot::Text(serde_json::to_string_pretty(
            &self.collections,
        )?))
    }

    fn import(&mut self, snapshot: &Snapshot) -> anyhow::Result<bool> {
        let Snapshot::Text(text) = snapshot else {
            return Ok(false);
        };
        match serde_json::from_str::<Collections>(text) {
            Ok(collections) => {
                self.collections = collections;
                self.flush_mirror();
                Ok(true)
            }
            Err(e) => {
                warn!("snapshot text rejected: {e}");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewStudent;
    use crate::store::Store;

    #[test]
    fn snapshot_text_carries_all_six_collections() {
        let store = Store::in_memory();
        let Some(Snapshot::Text(text)) = store.export() else {
            panic!("expected text snapshot");
        };
        let value: serde_json::Value = serde_json::from_str(&text).expect("valid json");
        for key in ["users", "students", "teachers", "parents", "classes", "grades"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn import_rejects_wrong_shape_and_bad_json() {
        let mut store = Store::in_memory();
        store
            .add_student(NewStudent {
                name: "Kept".to_string(),
                ..Default::default()
            })
            .expect("add");

        assert!(!store.import(&Snapshot::Text("{}".to_string())));
        assert!(!store.import(&Snapshot::Text("{\"foo\": []}".to_string())));
        assert!(!store.import(&Snapshot::Text("not json".to_string())));

        assert_eq!(store.students(&StudentFilter::default()).len(), 1);
    }

    #[test]
    fn mirror_file_survives_reopen() {
        let dir = std::env::temp_dir().join(format!(
            "schoold-mirror-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        let mirror = dir.join("store.json");

        {
            let mut backend = MemoryBackend::with_mirror(mirror.clone());
            backend
                .insert_user(&User {
                    user_id: "U1".to_string(),
                    name: "Mirrored".to_string(),
                    email: String::new(),
                    phone: String::new(),
                    role: "teacher".to_string(),
                    password: String::new(),
                    created_at: crate::store::now_timestamp(),
                })
                .expect("insert");
        }

        let reopened = MemoryBackend::with_mirror(mirror);
        let found = reopened.find_user("U1").expect("lookup");
        assert_eq!(found.map(|u| u.name), Some("Mirrored".to_string()));

        let _ = std::fs::remove_dir_all(dir);
    }
}
