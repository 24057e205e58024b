use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use uuid::Uuid;

use crate::auth;
use crate::grade;

pub const DB_FILE_NAME: &str = "gradebook.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users(
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL CHECK(role IN ('admin','teacher','student')),
            full_name TEXT NOT NULL,
            email TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            student_no TEXT NOT NULL UNIQUE,
            full_name TEXT NOT NULL,
            email TEXT,
            phone TEXT,
            birth_date TEXT,
            class_name TEXT,
            major TEXT,
            status TEXT NOT NULL DEFAULT 'active' CHECK(status IN ('active','inactive')),
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            credits INTEGER NOT NULL CHECK(credits > 0),
            semester TEXT
        )",
        [],
    )?;

    // average/letter are derived from (midterm, final) by the grade
    // engine on insert; they are never written independently.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS scores(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            midterm REAL,
            final REAL,
            average REAL,
            letter TEXT,
            semester TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY(student_id) REFERENCES students(id) ON DELETE CASCADE,
            FOREIGN KEY(subject_id) REFERENCES subjects(id) ON DELETE CASCADE
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_scores_student ON scores(student_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_scores_subject ON scores(subject_id)",
        [],
    )?;

    ensure_admin_user(&conn)?;

    Ok(conn)
}

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// One admin account is always present so a fresh workspace is usable.
fn ensure_admin_user(conn: &Connection) -> anyhow::Result<()> {
    let existing: Option<String> = conn
        .query_row("SELECT id FROM users WHERE username = 'admin'", [], |r| {
            r.get(0)
        })
        .optional()?;
    if existing.is_some() {
        return Ok(());
    }

    let hash = auth::hash_password("admin123")?;
    conn.execute(
        "INSERT INTO users(id, username, password_hash, role, full_name, email)
         VALUES(?, 'admin', ?, 'admin', 'Quản trị viên', 'admin@example.com')",
        (Uuid::new_v4().to_string(), hash),
    )?;
    log::info!("seeded bootstrap admin account");
    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SeedSummary {
    pub users: usize,
    pub students: usize,
    pub subjects: usize,
    pub scores: usize,
}

/// Seeds the sample accounts, students, subjects and scores. Idempotent
/// per section: a section that already has data is left alone.
pub fn seed_samples(conn: &mut Connection) -> anyhow::Result<SeedSummary> {
    let mut summary = SeedSummary::default();
    let tx = conn.transaction()?;

    for (username, password, role, full_name, email) in [
        (
            "teacher",
            "teacher123",
            "teacher",
            "Nguyễn Văn Giáo",
            "teacher@example.com",
        ),
        (
            "student",
            "student123",
            "student",
            "Trần Thị Sinh Viên",
            "student@example.com",
        ),
    ] {
        let exists: Option<String> = tx
            .query_row("SELECT id FROM users WHERE username = ?", [username], |r| {
                r.get(0)
            })
            .optional()?;
        if exists.is_none() {
            let hash = auth::hash_password(password)?;
            tx.execute(
                "INSERT INTO users(id, username, password_hash, role, full_name, email)
                 VALUES(?, ?, ?, ?, ?, ?)",
                (
                    Uuid::new_v4().to_string(),
                    username,
                    hash,
                    role,
                    full_name,
                    email,
                ),
            )?;
            summary.users += 1;
        }
    }

    let student_count: i64 = tx.query_row("SELECT COUNT(*) FROM students", [], |r| r.get(0))?;
    if student_count == 0 {
        let samples = [
            (
                "SV001",
                "Nguyễn Văn An",
                "nva@student.edu.vn",
                "0901234567",
                "CNTT-K17",
                "Công nghệ thông tin",
            ),
            (
                "SV002",
                "Trần Thị Bình",
                "ttb@student.edu.vn",
                "0907654321",
                "CNTT-K17",
                "Công nghệ thông tin",
            ),
            (
                "SV003",
                "Lê Văn Cường",
                "lvc@student.edu.vn",
                "0912345678",
                "CNTT-K17",
                "Khoa học máy tính",
            ),
            (
                "SV004",
                "Phạm Thị Dung",
                "ptd@student.edu.vn",
                "0987654321",
                "KTPM-K17",
                "Kỹ thuật phần mềm",
            ),
            (
                "SV005",
                "Hoàng Văn Em",
                "hve@student.edu.vn",
                "0923456789",
                "KTPM-K17",
                "Kỹ thuật phần mềm",
            ),
        ];
        for (student_no, full_name, email, phone, class_name, major) in samples {
            tx.execute(
                "INSERT INTO students(
                   id, student_no, full_name, email, phone, class_name, major, status, created_at
                 ) VALUES(?, ?, ?, ?, ?, ?, ?, 'active', ?)",
                (
                    Uuid::new_v4().to_string(),
                    student_no,
                    full_name,
                    email,
                    phone,
                    class_name,
                    major,
                    now_rfc3339(),
                ),
            )?;
            summary.students += 1;
        }
    }

    let subject_count: i64 = tx.query_row("SELECT COUNT(*) FROM subjects", [], |r| r.get(0))?;
    if subject_count == 0 {
        let samples = [
            ("IT001", "Lập trình căn bản", 3_i64, "HK1-2024"),
            ("IT002", "Cấu trúc dữ liệu và giải thuật", 4, "HK1-2024"),
            ("IT003", "Cơ sở dữ liệu", 3, "HK1-2024"),
            ("IT004", "Mạng máy tính", 3, "HK2-2024"),
            ("IT005", "Công nghệ web", 4, "HK2-2024"),
        ];
        for (code, name, credits, semester) in samples {
            tx.execute(
                "INSERT INTO subjects(id, code, name, credits, semester) VALUES(?, ?, ?, ?, ?)",
                (Uuid::new_v4().to_string(), code, name, credits, semester),
            )?;
            summary.subjects += 1;
        }
    }

    let score_count: i64 = tx.query_row("SELECT COUNT(*) FROM scores", [], |r| r.get(0))?;
    if score_count == 0 {
        let student_ids: Vec<String> = {
            let mut stmt = tx.prepare("SELECT id FROM students ORDER BY student_no")?;
            let ids = stmt
                .query_map([], |r| r.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
            ids
        };
        // Only the first three subjects get sample scores.
        let subject_ids: Vec<String> = {
            let mut stmt = tx.prepare("SELECT id FROM subjects ORDER BY code LIMIT 3")?;
            let ids = stmt
                .query_map([], |r| r.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
            ids
        };

        let sample_marks = [(7.5, 8.0), (6.0, 7.0), (8.5, 9.0), (5.0, 6.5), (9.0, 9.5)];
        for (i, student_id) in student_ids.iter().enumerate() {
            for (j, subject_id) in subject_ids.iter().enumerate() {
                let (midterm, final_score) = sample_marks[(i + j) % sample_marks.len()];
                let graded = grade::compute_average(Some(midterm), Some(final_score));
                let (average, letter) = match graded {
                    Some(v) => v,
                    None => continue,
                };
                tx.execute(
                    "INSERT INTO scores(
                       id, student_id, subject_id, midterm, final, average, letter, semester, created_at
                     ) VALUES(?, ?, ?, ?, ?, ?, ?, 'HK1-2024', ?)",
                    (
                        Uuid::new_v4().to_string(),
                        student_id,
                        subject_id,
                        midterm,
                        final_score,
                        average,
                        letter.as_str(),
                        now_rfc3339(),
                    ),
                )?;
                summary.scores += 1;
            }
        }
    }

    tx.commit()?;
    Ok(summary)
}
