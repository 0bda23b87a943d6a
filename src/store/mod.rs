//! The record store: one facade over two interchangeable backends.
//!
//! On open we try the relational (sqlite) backend first and fall back to the
//! in-memory one, so call sites stay backend-agnostic. Every public
//! operation keeps the original contract: faults come back as values of a
//! closed taxonomy, queries degrade to empty results, and nothing panics or
//! propagates an engine error across the store boundary.

mod memory;
mod sqlite;

use std::path::Path;

use chrono::{Datelike, SecondsFormat, Utc};
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use crate::model::{
    Class, Grade, GradeFilter, NewClass, NewGrade, NewParent, NewStudent, NewTeacher, NewUser,
    Parent, Student, StudentFilter, Teacher, TeacherFilter, User,
};
use memory::MemoryBackend;
use sqlite::SqliteBackend;

/// Fixed bootstrap accounts: id, name, email, role, password.
/// Existing deployments depend on these exact values.
const SEED_USERS: [(&str, &str, &str, &str, &str); 4] = [
    (
        "SUPER001",
        "System Administrator",
        "admin@school.edu",
        "super_admin",
        "admin123",
    ),
    (
        "DIR001",
        "School Director",
        "director@school.edu",
        "director",
        "director123",
    ),
    (
        "TEACH001",
        "John Smith",
        "j.smith@school.edu",
        "teacher",
        "teacher123",
    ),
    (
        "PAR001",
        "Parent Johnson",
        "parent@email.com",
        "parent",
        "parent123",
    ),
];

#[derive(Debug, Error, PartialEq)]
pub enum StoreFault {
    #[error("user id already exists")]
    DuplicateKey,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("snapshot does not match the store backend")]
    ImportShapeMismatch,
    #[error("store operation failed: {0}")]
    Store(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Sqlite,
    Memory,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Sqlite => "sqlite",
            BackendKind::Memory => "memory",
        }
    }
}

/// A full serialized copy of store state. Binary for the relational backend
/// (the database file verbatim), text for the in-memory one (JSON of all six
/// collections). Only consumable by a store of the matching backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Binary(Vec<u8>),
    Text(String),
}

pub(crate) trait Backend {
    fn kind(&self) -> BackendKind;

    fn insert_user(&mut self, user: &User) -> anyhow::Result<()>;
    fn find_user(&self, user_id: &str) -> anyhow::Result<Option<User>>;
    fn find_credentials(&self, user_id: &str, password: &str) -> anyhow::Result<Option<User>>;
    fn users(&self) -> anyhow::Result<Vec<User>>;

    fn insert_student(&mut self, student: &Student) -> anyhow::Result<()>;
    fn students(&self, filter: &StudentFilter) -> anyhow::Result<Vec<Student>>;

    fn insert_teacher(&mut self, teacher: &Teacher) -> anyhow::Result<()>;
    fn teachers(&self, filter: &TeacherFilter) -> anyhow::Result<Vec<Teacher>>;

    fn insert_parent(&mut self, parent: &Parent) -> anyhow::Result<()>;
    fn parents(&self) -> anyhow::Result<Vec<Parent>>;

    fn insert_class(&mut self, class: &Class) -> anyhow::Result<()>;
    fn classes(&self) -> anyhow::Result<Vec<Class>>;

    fn insert_grade(&mut self, grade: &Grade) -> anyhow::Result<()>;
    fn grades(&self, filter: &GradeFilter) -> anyhow::Result<Vec<Grade>>;

    fn export(&self) -> anyhow::Result<Snapshot>;
    /// Wholesale state replacement. `Ok(false)` means the snapshot did not
    /// match this backend's shape; prior state is untouched.
    fn import(&mut self, snapshot: &Snapshot) -> anyhow::Result<bool>;
}

pub struct Store {
    backend: Box<dyn Backend>,
}

impl Store {
    /// Open the store in a workspace directory: sqlite when the engine is
    /// available, otherwise the in-memory backend mirrored to a JSON file.
    /// Seeds the default accounts either way.
    pub fn open(workspace: &Path) -> Store {
        let backend: Box<dyn Backend> = match SqliteBackend::open(workspace) {
            Ok(b) => Box::new(b),
            Err(e) => {
                warn!(
                    "relational backend unavailable ({e:#}); falling back to in-memory store"
                );
                Box::new(MemoryBackend::with_mirror(workspace.join("store.json")))
            }
        };
        let mut store = Store { backend };
        store.seed_defaults();
        store
    }

    /// Purely in-memory store, no mirror file. Used by tests and by callers
    /// that never selected a workspace.
    #[allow(dead_code)]
    pub fn in_memory() -> Store {
        let mut store = Store {
            backend: Box::new(MemoryBackend::new()),
        };
        store.seed_defaults();
        store
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Insert the fixed bootstrap accounts, skipping ids that already exist.
    pub(crate) fn seed_defaults(&mut self) {
        for (user_id, name, email, role, password) in SEED_USERS {
            let result = self.register_user(NewUser {
                user_id: Some(user_id.to_string()),
                name: name.to_string(),
                email: email.to_string(),
                phone: String::new(),
                role: role.to_string(),
                password: password.to_string(),
            });
            match result {
                Ok(_) | Err(StoreFault::DuplicateKey) => {}
                Err(e) => warn!("seeding {user_id} failed: {e}"),
            }
        }
    }

    /// Register a user. Honors a caller-supplied id and fails with
    /// `DuplicateKey` when it is already taken; generates one otherwise.
    pub fn register_user(&mut self, new: NewUser) -> Result<String, StoreFault> {
        let user_id = match new.user_id.filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => generate_id("USER"),
        };
        if self
            .backend
            .find_user(&user_id)
            .map_err(engine_fault)?
            .is_some()
        {
            return Err(StoreFault::DuplicateKey);
        }
        let user = User {
            user_id: user_id.clone(),
            name: new.name,
            email: new.email,
            phone: new.phone,
            role: new.role,
            password: new.password,
            created_at: now_timestamp(),
        };
        self.backend.insert_user(&user).map_err(engine_fault)?;
        Ok(user_id)
    }

    /// Exact-match lookup on id and password, plain text on both sides.
    pub fn authenticate(&self, user_id: &str, password: &str) -> Result<User, StoreFault> {
        match self.backend.find_credentials(user_id, password) {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(StoreFault::InvalidCredentials),
            Err(e) => Err(engine_fault(e)),
        }
    }

    // The add_* family always assigns a fresh generated id, never reusing a
    // caller-supplied one. Asymmetric with register_user on purpose.

    pub fn add_student(&mut self, new: NewStudent) -> Result<String, StoreFault> {
        let student_id = generate_id("STU");
        let student = Student {
            student_id: student_id.clone(),
            name: new.name,
            email: new.email,
            phone: new.phone,
            class_id: new.class_id,
            parent_id: new.parent_id,
            enrollment_date: new
                .enrollment_date
                .filter(|d| !d.is_empty())
                .unwrap_or_else(today),
            status: "active".to_string(),
            created_at: now_timestamp(),
        };
        self.backend.insert_student(&student).map_err(engine_fault)?;
        Ok(student_id)
    }

    pub fn add_teacher(&mut self, new: NewTeacher) -> Result<String, StoreFault> {
        let teacher_id = generate_id("TEACH");
        let teacher = Teacher {
            teacher_id: teacher_id.clone(),
            name: new.name,
            email: new.email,
            phone: new.phone,
            subject: new.subject,
            department: new.department,
            hire_date: new.hire_date.filter(|d| !d.is_empty()).unwrap_or_else(today),
            status: "active".to_string(),
            created_at: now_timestamp(),
        };
        self.backend.insert_teacher(&teacher).map_err(engine_fault)?;
        Ok(teacher_id)
    }

    pub fn add_parent(&mut self, new: NewParent) -> Result<String, StoreFault> {
        let parent_id = generate_id("PAR");
        let parent = Parent {
            parent_id: parent_id.clone(),
            name: new.name,
            email: new.email,
            phone: new.phone,
            address: new.address,
            occupation: new.occupation,
            created_at: now_timestamp(),
        };
        self.backend.insert_parent(&parent).map_err(engine_fault)?;
        Ok(parent_id)
    }

    pub fn add_class(&mut self, new: NewClass) -> Result<String, StoreFault> {
        let class_id = generate_id("CLS");
        let class = Class {
            class_id: class_id.clone(),
            class_name: new.class_name,
            grade_level: new.grade_level,
            teacher_id: new.teacher_id,
            capacity: new.capacity.unwrap_or(30),
            academic_year: new
                .academic_year
                .filter(|y| !y.is_empty())
                .unwrap_or_else(current_year),
            created_at: now_timestamp(),
        };
        self.backend.insert_class(&class).map_err(engine_fault)?;
        Ok(class_id)
    }

    pub fn add_grade(&mut self, new: NewGrade) -> Result<String, StoreFault> {
        let grade_id = generate_id("GRD");
        let grade = Grade {
            grade_id: grade_id.clone(),
            student_id: new.student_id,
            subject: new.subject,
            grade_value: new.grade_value,
            max_grade: new.max_grade.unwrap_or(100.0),
            term: new
                .term
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Term 1".to_string()),
            academic_year: new
                .academic_year
                .filter(|y| !y.is_empty())
                .unwrap_or_else(current_year),
            teacher_id: new.teacher_id,
            created_at: now_timestamp(),
        };
        self.backend.insert_grade(&grade).map_err(engine_fault)?;
        Ok(grade_id)
    }

    // Queries degrade to an empty result on engine failure, matching the
    // original surface. Ordering: name ascending for people and classes,
    // newest first for grades.

    pub fn users(&self) -> Vec<User> {
        self.backend.users().unwrap_or_else(empty_on_error("users"))
    }

    pub fn students(&self, filter: &StudentFilter) -> Vec<Student> {
        self.backend
            .students(filter)
            .unwrap_or_else(empty_on_error("students"))
    }

    pub fn teachers(&self, filter: &TeacherFilter) -> Vec<Teacher> {
        self.backend
            .teachers(filter)
            .unwrap_or_else(empty_on_error("teachers"))
    }

    pub fn parents(&self) -> Vec<Parent> {
        self.backend
            .parents()
            .unwrap_or_else(empty_on_error("parents"))
    }

    pub fn classes(&self) -> Vec<Class> {
        self.backend
            .classes()
            .unwrap_or_else(empty_on_error("classes"))
    }

    pub fn grades(&self, filter: &GradeFilter) -> Vec<Grade> {
        self.backend
            .grades(filter)
            .unwrap_or_else(empty_on_error("grades"))
    }

    pub fn export(&self) -> Option<Snapshot> {
        match self.backend.export() {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                error!("export failed: {e:#}");
                None
            }
        }
    }

    /// Restore the whole store from a snapshot of the matching shape.
    /// Returns false on shape mismatch or parse error; prior state stays.
    pub fn import(&mut self, snapshot: &Snapshot) -> bool {
        match self.backend.import(snapshot) {
            Ok(replaced) => replaced,
            Err(e) => {
                error!("import failed: {e:#}");
                false
            }
        }
    }
}

fn engine_fault(e: anyhow::Error) -> StoreFault {
    error!("store engine error: {e:#}");
    StoreFault::Store(e.to_string())
}

fn empty_on_error<T>(collection: &'static str) -> impl FnOnce(anyhow::Error) -> Vec<T> {
    move |e| {
        error!("{collection} query failed: {e:#}");
        Vec::new()
    }
}

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// `prefix + base36(unix millis) + 5 base36 chars of entropy`, upper-cased.
/// Collisions are possible but treated as negligible; callers never retry.
pub(crate) fn generate_id(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u128;
    let entropy = u128::from_be_bytes(*Uuid::new_v4().as_bytes());
    format!("{}{}{}", prefix, base36(millis), base36_fixed(entropy, 5)).to_uppercase()
}

fn base36(mut n: u128) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36[(n % 36) as usize] as char);
        n /= 36;
    }
    digits.iter().rev().collect()
}

fn base36_fixed(n: u128, width: u32) -> String {
    let mut v = n % 36u128.pow(width);
    let mut digits = vec!['0'; width as usize];
    for slot in digits.iter_mut().rev() {
        *slot = BASE36[(v % 36) as usize] as char;
        v /= 36;
    }
    digits.into_iter().collect()
}

pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

fn current_year() -> String {
    Utc::now().year().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_workspace(prefix: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!(
            "{}-{}",
            prefix,
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        std::fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    fn student(name: &str, class_id: &str) -> NewStudent {
        NewStudent {
            name: name.to_string(),
            class_id: class_id.to_string(),
            ..Default::default()
        }
    }

    fn grade(student_id: &str, subject: &str) -> NewGrade {
        NewGrade {
            student_id: student_id.to_string(),
            subject: subject.to_string(),
            grade_value: 80.0,
            ..Default::default()
        }
    }

    #[test]
    fn generated_ids_follow_prefix_convention() {
        let id = generate_id("STU");
        assert!(id.starts_with("STU"), "{id}");
        assert_eq!(id, id.to_uppercase());
        assert!(id.len() > "STU".len() + 5);
    }

    #[test]
    fn add_assigns_retrievable_ids() {
        let mut store = Store::in_memory();

        let sid = store.add_student(student("Ann", "C1")).expect("add student");
        assert!(sid.starts_with("STU"));
        assert!(store
            .students(&StudentFilter::default())
            .iter()
            .any(|s| s.student_id == sid));

        let tid = store
            .add_teacher(NewTeacher {
                name: "Mr. Lee".to_string(),
                department: "Math".to_string(),
                ..Default::default()
            })
            .expect("add teacher");
        assert!(tid.starts_with("TEACH"));
        assert!(store
            .teachers(&TeacherFilter::default())
            .iter()
            .any(|t| t.teacher_id == tid));

        let gid = store.add_grade(grade(&sid, "Math")).expect("add grade");
        assert!(gid.starts_with("GRD"));
        assert!(store
            .grades(&GradeFilter::default())
            .iter()
            .any(|g| g.grade_id == gid));

        let pid = store.add_parent(NewParent::default()).expect("add parent");
        assert!(pid.starts_with("PAR"));
        let cid = store.add_class(NewClass::default()).expect("add class");
        assert!(cid.starts_with("CLS"));

        let uid = store
            .register_user(NewUser {
                name: "Fresh".to_string(),
                role: "teacher".to_string(),
                ..Default::default()
            })
            .expect("register without id");
        assert!(uid.starts_with("USER"));
    }

    #[test]
    fn duplicate_register_leaves_existing_record() {
        let mut store = Store::in_memory();
        store
            .register_user(NewUser {
                user_id: Some("U1".to_string()),
                name: "First".to_string(),
                role: "teacher".to_string(),
                password: "pw".to_string(),
                ..Default::default()
            })
            .expect("first register");

        let second = store.register_user(NewUser {
            user_id: Some("U1".to_string()),
            name: "Second".to_string(),
            role: "parent".to_string(),
            password: "other".to_string(),
            ..Default::default()
        });
        assert_eq!(second, Err(StoreFault::DuplicateKey));

        let kept: Vec<_> = store
            .users()
            .into_iter()
            .filter(|u| u.user_id == "U1")
            .collect();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "First");
        assert_eq!(kept[0].password, "pw");
    }

    #[test]
    fn authenticate_requires_exact_id_and_password() {
        let mut store = Store::in_memory();
        store
            .register_user(NewUser {
                user_id: Some("U1".to_string()),
                name: "Someone".to_string(),
                role: "teacher".to_string(),
                password: "secret".to_string(),
                ..Default::default()
            })
            .expect("register");

        let user = store.authenticate("U1", "secret").expect("valid login");
        assert_eq!(user.name, "Someone");

        assert_eq!(
            store.authenticate("U1", "wrong").unwrap_err(),
            StoreFault::InvalidCredentials
        );
        assert_eq!(
            store.authenticate("NOPE", "secret").unwrap_err(),
            StoreFault::InvalidCredentials
        );
        assert_eq!(
            store.authenticate("NOPE", "wrong").unwrap_err(),
            StoreFault::InvalidCredentials
        );
    }

    #[test]
    fn student_filters_compose_and_order_by_name() {
        let mut store = Store::in_memory();
        store.add_student(student("Bob", "C1")).expect("add");
        store.add_student(student("Amy", "C1")).expect("add");
        store.add_student(student("Cid", "C2")).expect("add");

        let hits = store.students(&StudentFilter {
            class_id: Some("C1".to_string()),
            status: Some("active".to_string()),
        });
        let names: Vec<_> = hits.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Amy", "Bob"]);

        // No filter: the whole collection, same ordering.
        let all: Vec<_> = store
            .students(&StudentFilter::default())
            .iter()
            .map(|s| s.name.clone())
            .collect();
        assert_eq!(all, ["Amy", "Bob", "Cid"]);
    }

    #[test]
    fn grade_queries_return_newest_first() {
        let mut store = Store::in_memory();
        let g1 = store.add_grade(grade("S1", "Math")).expect("g1");
        let g2 = store.add_grade(grade("S1", "Art")).expect("g2");
        let g3 = store.add_grade(grade("S2", "Math")).expect("g3");

        let ids: Vec<_> = store
            .grades(&GradeFilter::default())
            .iter()
            .map(|g| g.grade_id.clone())
            .collect();
        assert_eq!(ids, [g3.clone(), g2, g1.clone()]);

        let math: Vec<_> = store
            .grades(&GradeFilter {
                subject: Some("Math".to_string()),
                ..Default::default()
            })
            .iter()
            .map(|g| g.grade_id.clone())
            .collect();
        assert_eq!(math, [g3, g1]);
    }

    #[test]
    fn seeding_is_idempotent() {
        let mut store = Store::in_memory();
        store.seed_defaults();
        store.seed_defaults();
        for id in ["SUPER001", "DIR001", "TEACH001", "PAR001"] {
            let count = store.users().iter().filter(|u| u.user_id == id).count();
            assert_eq!(count, 1, "{id} seeded more than once");
        }
        let admin = store.authenticate("SUPER001", "admin123").expect("seed login");
        assert_eq!(admin.role, "super_admin");
    }

    #[test]
    fn memory_snapshot_round_trips() {
        let mut source = Store::in_memory();
        source.add_student(student("Ann", "C1")).expect("add");
        source.add_grade(grade("S1", "Math")).expect("add");

        let snapshot = source.export().expect("export");
        assert!(matches!(snapshot, Snapshot::Text(_)));

        let mut restored = Store::in_memory();
        assert!(restored.import(&snapshot));
        assert_eq!(
            restored.students(&StudentFilter::default()),
            source.students(&StudentFilter::default())
        );
        assert_eq!(
            restored.grades(&GradeFilter::default()),
            source.grades(&GradeFilter::default())
        );
        assert_eq!(restored.users(), source.users());
    }

    #[test]
    fn memory_store_rejects_binary_snapshot() {
        let mut store = Store::in_memory();
        assert!(!store.import(&Snapshot::Binary(vec![1, 2, 3])));
        // Seeds are still there.
        assert_eq!(store.users().len(), 4);
    }

    #[test]
    fn sqlite_store_filters_and_duplicates() {
        let workspace = temp_workspace("schoold-store-sqlite");
        let mut store = Store::open(&workspace);
        assert_eq!(store.backend_kind(), BackendKind::Sqlite);

        store.add_student(student("Bob", "C1")).expect("add");
        store.add_student(student("Amy", "C1")).expect("add");
        store.add_student(student("Cid", "C2")).expect("add");
        let names: Vec<_> = store
            .students(&StudentFilter {
                class_id: Some("C1".to_string()),
                status: Some("active".to_string()),
            })
            .iter()
            .map(|s| s.name.clone())
            .collect();
        assert_eq!(names, ["Amy", "Bob"]);

        let dup = store.register_user(NewUser {
            user_id: Some("SUPER001".to_string()),
            name: "Impostor".to_string(),
            role: "super_admin".to_string(),
            ..Default::default()
        });
        assert_eq!(dup, Err(StoreFault::DuplicateKey));

        let _ = std::fs::remove_dir_all(workspace);
    }

    #[test]
    fn sqlite_reopen_does_not_reseed() {
        let workspace = temp_workspace("schoold-store-reseed");
        {
            let store = Store::open(&workspace);
            assert_eq!(store.users().len(), 4);
        }
        let store = Store::open(&workspace);
        let count = store
            .users()
            .iter()
            .filter(|u| u.user_id == "SUPER001")
            .count();
        assert_eq!(count, 1);

        let _ = std::fs::remove_dir_all(workspace);
    }

    #[test]
    fn sqlite_snapshot_round_trips_and_rejects_garbage() {
        let ws_a = temp_workspace("schoold-store-snap-a");
        let ws_b = temp_workspace("schoold-store-snap-b");

        let mut source = Store::open(&ws_a);
        let sid = source.add_student(student("Ann", "C1")).expect("add");
        let snapshot = source.export().expect("export");
        assert!(matches!(snapshot, Snapshot::Binary(_)));

        let mut restored = Store::open(&ws_b);
        assert!(restored.import(&snapshot));
        assert!(restored
            .students(&StudentFilter::default())
            .iter()
            .any(|s| s.student_id == sid));

        // A garbage byte dump must not clobber the restored state.
        assert!(!restored.import(&Snapshot::Binary(b"not a database".to_vec())));
        assert!(restored
            .students(&StudentFilter::default())
            .iter()
            .any(|s| s.student_id == sid));

        // Text snapshots do not fit the relational backend.
        assert!(!restored.import(&Snapshot::Text("{}".to_string())));

        let _ = std::fs::remove_dir_all(ws_a);
        let _ = std::fs::remove_dir_all(ws_b);
    }
}
