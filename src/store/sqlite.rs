//! Relational backend over the workspace sqlite database. Query building
//! follows the entity filters: a base statement plus AND clauses, params
//! bound positionally. Snapshots are the database file verbatim.

use std::path::{Path, PathBuf};

use anyhow::Context;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::warn;

use crate::db;
use crate::model::{Class, Grade, GradeFilter, Parent, Student, StudentFilter, Teacher,
    TeacherFilter, User};
use crate::store::{Backend, BackendKind, Snapshot};

pub(crate) struct SqliteBackend {
    workspace: PathBuf,
    conn: Connection,
}

impl SqliteBackend {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        let conn = db::open_db(workspace)?;
        Ok(SqliteBackend {
            workspace: workspace.to_path_buf(),
            conn,
        })
    }

    fn db_path(&self) -> PathBuf {
        self.workspace.join(db::DB_FILE)
    }
}

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        user_id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        role: row.get(4)?,
        password: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn row_to_student(row: &Row) -> rusqlite::Result<Student> {
    Ok(Student {
        student_id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        class_id: row.get(4)?,
        parent_id: row.get(5)?,
        enrollment_date: row.get(6)?,
        status: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn row_to_teacher(row: &Row) -> rusqlite::Result<Teacher> {
    Ok(Teacher {
        teacher_id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        subject: row.get(4)?,
        department: row.get(5)?,
        hire_date: row.get(6)?,
        status: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn row_to_parent(row: &Row) -> rusqlite::Result<Parent> {
    Ok(Parent {
        parent_id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        address: row.get(4)?,
        occupation: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn row_to_class(row: &Row) -> rusqlite::Result<Class> {
    Ok(Class {
        class_id: row.get(0)?,
        class_name: row.get(1)?,
        grade_level: row.get(2)?,
        teacher_id: row.get(3)?,
        capacity: row.get(4)?,
        academic_year: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn row_to_grade(row: &Row) -> rusqlite::Result<Grade> {
    Ok(Grade {
        grade_id: row.get(0)?,
        student_id: row.get(1)?,
        subject: row.get(2)?,
        grade_value: row.get(3)?,
        max_grade: row.get(4)?,
        term: row.get(5)?,
        academic_year: row.get(6)?,
        teacher_id: row.get(7)?,
        created_at: row.get(8)?,
    })
}

const USER_COLS: &str = "user_id, name, email, phone, role, password, created_at";
const STUDENT_COLS: &str =
    "student_id, name, email, phone, class_id, parent_id, enrollment_date, status, created_at";
const TEACHER_COLS: &str =
    "teacher_id, name, email, phone, subject, department, hire_date, status, created_at";
const PARENT_COLS: &str = "parent_id, name, email, phone, address, occupation, created_at";
const CLASS_COLS: &str =
    "class_id, class_name, grade_level, teacher_id, capacity, academic_year, created_at";
const GRADE_COLS: &str =
    "grade_id, student_id, subject, grade_value, max_grade, term, academic_year, teacher_id, created_at";

impl Backend for SqliteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn insert_user(&mut self, user: &User) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO users(user_id, name, email, phone, role, password, created_at)
             VALUES(?, ?, ?, ?, ?, ?, ?)",
            params![
                user.user_id,
                user.name,
                user.email,
                user.phone,
                user.role,
                user.password,
                user.created_at
            ],
        )?;
        Ok(())
    }

    fn find_user(&self, user_id: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLS} FROM users WHERE user_id = ?");
        Ok(self
            .conn
            .query_row(&sql, [user_id], row_to_user)
            .optional()?)
    }

    fn find_credentials(&self, user_id: &str, password: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLS} FROM users WHERE user_id = ? AND password = ?");
        Ok(self
            .conn
            .query_row(&sql, [user_id, password], row_to_user)
            .optional()?)
    }

    fn users(&self) -> anyhow::Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLS} FROM users ORDER BY name");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_user)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn insert_student(&mut self, student: &Student) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO students(student_id, name, email, phone, class_id, parent_id,
                                  enrollment_date, status, created_at)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                student.student_id,
                student.name,
                student.email,
                student.phone,
                student.class_id,
                student.parent_id,
                student.enrollment_date,
                student.status,
                student.created_at
            ],
        )?;
        Ok(())
    }

    fn students(&self, filter: &StudentFilter) -> anyhow::Result<Vec<Student>> {
        let mut sql = format!("SELECT {STUDENT_COLS} FROM students WHERE 1=1");
        let mut binds: Vec<String> = Vec::new();
        if let Some(class_id) = &filter.class_id {
            sql.push_str(" AND class_id = ?");
            binds.push(class_id.clone());
        }
        if let Some(status) = &filter.status {
            sql.push_str(" AND status = ?");
            binds.push(status.clone());
        }
        sql.push_str(" ORDER BY name");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(binds.iter()), row_to_student)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn insert_teacher(&mut self, teacher: &Teacher) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO teachers(teacher_id, name, email, phone, subject, department,
                                  hire_date, status, created_at)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                teacher.teacher_id,
                teacher.name,
                teacher.email,
                teacher.phone,
                teacher.subject,
                teacher.department,
                teacher.hire_date,
                teacher.status,
                teacher.created_at
            ],
        )?;
        Ok(())
    }

    fn teachers(&self, filter: &TeacherFilter) -> anyhow::Result<Vec<Teacher>> {
        let mut sql = format!("SELECT {TEACHER_COLS} FROM teachers WHERE 1=1");
        let mut binds: Vec<String> = Vec::new();
        if let Some(department) = &filter.department {
            sql.push_str(" AND department = ?");
            binds.push(department.clone());
        }
        if let Some(status) = &filter.status {
            sql.push_str(" AND status = ?");
            binds.push(status.clone());
        }
        sql.push_str(" ORDER BY name");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(binds.iter()), row_to_teacher)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn insert_parent(&mut self, parent: &Parent) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO parents(parent_id, name, email, phone, address, occupation, created_at)
             VALUES(?, ?, ?, ?, ?, ?, ?)",
            params![
                parent.parent_id,
                parent.name,
                parent.email,
                parent.phone,
                parent.address,
                parent.occupation,
                parent.created_at
            ],
        )?;
        Ok(())
    }

    fn parents(&self) -> anyhow::Result<Vec<Parent>> {
        let sql = format!("SELECT {PARENT_COLS} FROM parents ORDER BY name");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_parent)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn insert_class(&mut self, class: &Class) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO classes(class_id, class_name, grade_level, teacher_id, capacity,
                                 academic_year, created_at)
             VALUES(?, ?, ?, ?, ?, ?, ?)",
            params![
                class.class_id,
                class.class_name,
                class.grade_level,
                class.teacher_id,
                class.capacity,
                class.academic_year,
                class.created_at
            ],
        )?;
        Ok(())
    }

    fn classes(&self) -> anyhow::Result<Vec<Class>> {
        let sql = format!("SELECT {CLASS_COLS} FROM classes ORDER BY class_name");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_class)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn insert_grade(&mut self, grade: &Grade) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO grades(grade_id, student_id, subject, grade_value, max_grade, term,
                                academic_year, teacher_id, created_at)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                grade.grade_id,
                grade.student_id,
                grade.subject,
                grade.grade_value,
                grade.max_grade,
                grade.term,
                grade.academic_year,
                grade.teacher_id,
                grade.created_at
            ],
        )?;
        Ok(())
    }

    fn grades(&self, filter: &GradeFilter) -> anyhow::Result<Vec<Grade>> {
        let mut sql = format!("SELECT {GRADE_COLS} FROM grades WHERE 1=1");
        let mut binds: Vec<String> = Vec::new();
        if let Some(student_id) = &filter.student_id {
            sql.push_str(" AND student_id = ?");
            binds.push(student_id.clone());
        }
        if let Some(subject) = &filter.subject {
            sql.push_str(" AND subject = ?");
            binds.push(subject.clone());
        }
        if let Some(term) = &filter.term {
            sql.push_str(" AND term = ?");
            binds.push(term.clone());
        }
        if let Some(year) = &filter.academic_year {
            sql.push_str(" AND academic_year = ?");
            binds.push(year.clone());
        }
        // rowid breaks same-timestamp ties in insertion order.
        sql.push_str(" ORDER BY created_at DESC, rowid DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(binds.iter()), row_to_grade)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn export(&self) -> anyhow::Result<Snapshot> {
        let bytes = std::fs::read(self.db_path())
            .with_context(|| format!("failed to read {}", self.db_path().display()))?;
        Ok(Snapshot::Binary(bytes))
    }

    fn import(&mut self, snapshot: &Snapshot) -> anyhow::Result<bool> {
        let Snapshot::Binary(bytes) = snapshot else {
            return Ok(false);
        };

        // Stage and probe the dump before touching the live database, so a
        // bad snapshot leaves prior state untouched.
        let staged = self.workspace.join(format!("{}.importing", db::DB_FILE));
        std::fs::write(&staged, bytes)
            .with_context(|| format!("failed to stage import at {}", staged.display()))?;
        let probe = Connection::open(&staged)
            .and_then(|conn| conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get::<_, i64>(0)));
        if let Err(e) = probe {
            warn!("snapshot bytes rejected: {e}");
            let _ = std::fs::remove_file(&staged);
            return Ok(false);
        }

        std::fs::rename(&staged, self.db_path())
            .with_context(|| format!("failed to replace {}", self.db_path().display()))?;
        self.conn = db::open_db(&self.workspace)?;
        Ok(true)
    }
}
