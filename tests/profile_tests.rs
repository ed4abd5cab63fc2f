// tests/profile_tests.rs

mod common;

use chrono::{Duration, Utc};
use common::{spawn_app, unique_email};
use serde_json::{Value, json};

#[tokio::test]
async fn profile_update_sanitizes_and_validates() {
    let app = spawn_app().await;
    let (client, _) = app.student().await;

    let response = client
        .put(app.url("/api/auth/user"))
        .json(&json!({
            "firstName": "Inès",
            "bio": "<p>Passionnée de sciences</p><script>alert(1)</script>",
            "profileImageUrl": "https://cdn.example.com/ines.png"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let user: Value = response.json().await.unwrap();
    assert_eq!(user["firstName"], "Inès");
    assert_eq!(user["lastName"], "Durand");
    assert_eq!(user["bio"], "<p>Passionnée de sciences</p>");
    assert_eq!(user["profileImageUrl"], "https://cdn.example.com/ines.png");

    let response = client
        .put(app.url("/api/auth/user"))
        .json(&json!({ "profileImageUrl": "javascript:alert(1)" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn student_applies_to_teach_and_waits_for_approval() {
    let app = spawn_app().await;
    let (client, id) = app.student().await;

    let response = client
        .post(app.url("/api/become-teacher"))
        .json(&json!({ "specialization": "Physique", "bio": "Dix ans d'enseignement au lycée" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let user: Value = response.json().await.unwrap();
    assert_eq!(user["role"], "teacher");
    assert_eq!(user["teacherStatus"], "pending");
    assert_eq!(user["specialization"], "Physique");

    // Applying twice is refused.
    let response = client
        .post(app.url("/api/become-teacher"))
        .json(&json!({ "specialization": "Physique", "bio": "Dix ans d'enseignement au lycée" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let pending: Vec<Value> = app
        .admin()
        .await
        .get(app.url("/api/admin/pending-teachers"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(pending.iter().any(|u| u["id"] == id));
}

#[tokio::test]
async fn teacher_application_needs_details() {
    let app = spawn_app().await;
    let (client, _) = app.student().await;

    let response = client
        .post(app.url("/api/become-teacher"))
        .json(&json!({ "specialization": "M", "bio": "court" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn admin_approves_and_rejects_teachers() {
    let app = spawn_app().await;
    let admin = app.admin().await;

    let approved = app.client();
    let a: Value = app
        .register(&approved, &unique_email("a"), "teacher")
        .await
        .json()
        .await
        .unwrap();
    let rejected = app.client();
    let r: Value = app
        .register(&rejected, &unique_email("r"), "teacher")
        .await
        .json()
        .await
        .unwrap();

    let res: Value = admin
        .post(app.url(&format!("/api/admin/teachers/{}/approve", a["id"])))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(res["teacherStatus"], "approved");

    let res: Value = admin
        .post(app.url(&format!("/api/admin/teachers/{}/reject", r["id"])))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(res["teacherStatus"], "rejected");

    assert_eq!(app.create_course(&approved, "Optique").await.status().as_u16(), 201);
    assert_eq!(app.create_course(&rejected, "Optique").await.status().as_u16(), 403);

    let pending: Vec<Value> = admin
        .get(app.url("/api/admin/pending-teachers"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(pending.is_empty());

    let response = admin
        .post(app.url("/api/admin/teachers/999999/approve"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    // Students are not teachers and cannot be approved.
    let (_, student_id) = app.student().await;
    let response = admin
        .post(app.url(&format!("/api/admin/teachers/{}/approve", student_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn admin_cannot_delete_themself() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let me: Value = admin
        .get(app.url("/api/auth/user"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["role"], "admin");

    let response = admin
        .delete(app.url(&format!("/api/admin/users/{}", me["id"])))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn deleting_a_teacher_removes_their_content() {
    let app = spawn_app().await;
    let (teacher, teacher_id) = app.approved_teacher().await;
    let course: Value = app.create_course(&teacher, "Électricité").await.json().await.unwrap();
    app.create_live(&teacher, &(Utc::now() + Duration::hours(5)).to_rfc3339(), 60)
        .await;

    let admin = app.admin().await;
    let response = admin
        .delete(app.url(&format!("/api/admin/users/{}", teacher_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let courses: Vec<Value> = admin
        .get(app.url("/api/admin/courses"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(courses.is_empty());

    let lives: Vec<Value> = admin
        .get(app.url("/api/admin/live-courses"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(lives.is_empty());

    let file_name = course["pdfUrl"].as_str().unwrap().trim_start_matches("/uploads/");
    assert!(!app.upload_dir.join(file_name).exists());
}

#[tokio::test]
async fn teacher_directory_lists_approved_teachers_with_counts() {
    let app = spawn_app().await;
    let (teacher, teacher_id) = app.approved_teacher().await;
    app.create_course(&teacher, "Mécanique").await;
    app.create_live(&teacher, &(Utc::now() + Duration::hours(5)).to_rfc3339(), 60)
        .await;
    app.register(&app.client(), &unique_email("pending"), "teacher").await;

    let teachers: Vec<Value> = app
        .client()
        .get(app.url("/api/teachers"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(teachers.len(), 1);
    assert_eq!(teachers[0]["id"], teacher_id);
    assert_eq!(teachers[0]["courseCount"], 1);
    assert_eq!(teachers[0]["liveCount"], 1);
}

#[tokio::test]
async fn dashboards_count_what_they_should() {
    let app = spawn_app().await;
    let (teacher, _) = app.approved_teacher().await;
    app.create_course(&teacher, "Chimie organique").await;
    app.create_live(&teacher, &(Utc::now() + Duration::hours(5)).to_rfc3339(), 60)
        .await;
    app.create_live(&teacher, &(Utc::now() - Duration::hours(5)).to_rfc3339(), 60)
        .await;
    app.register(&app.client(), &unique_email("pending"), "teacher").await;
    let (student, _) = app.student().await;

    let stats: Value = student
        .get(app.url("/api/stats/student"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["totalCourses"], 1);
    assert_eq!(stats["upcomingLives"], 1);
    assert_eq!(stats["studyHours"], 0);
    assert_eq!(stats["enrolledCourses"], 0);

    let stats: Value = teacher
        .get(app.url("/api/stats/teacher"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["totalCourses"], 1);
    assert_eq!(stats["totalLives"], 2);
    assert_eq!(stats["totalViews"], 0);
    assert_eq!(stats["totalStudents"], 0);

    let admin = app.admin().await;
    let stats: Value = admin
        .get(app.url("/api/stats/admin"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    // Admin, approved teacher, pending teacher, student.
    assert_eq!(stats["totalUsers"], 4);
    assert_eq!(stats["totalTeachers"], 1);
    assert_eq!(stats["pendingTeachers"], 1);
    assert_eq!(stats["totalCourses"], 1);
    assert_eq!(stats["totalLives"], 2);

    let response = student.get(app.url("/api/stats/admin")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 403);
}
