use crate::store::Store;
use axum::Router;
use axum::middleware;
use axum::routing::{get, patch, post, put};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use self::guard::{ADMIN, COORDINATOR, FACULTY, PANEL_MANAGERS, require_roles};
use self::routes::{admin, coordinator, faculty, health, panels};

pub mod envelope;
pub mod guard;
pub mod routes;
pub mod sanitize;

/// Build the API router. Every route group sits behind the role guard for
/// the roles allowed to use it; `/health` is open.
pub fn create_app(store: Store) -> Router {
    let admin_routes = Router::new()
        .route("/admin/faculty", get(admin::list_faculty).post(admin::create_faculty))
        .route("/admin/faculty/bulk", post(admin::create_faculty_bulk))
        .route(
            "/admin/faculty/{employee_id}",
            put(admin::update_faculty).delete(admin::delete_faculty),
        )
        .route("/admin/admins", post(admin::create_admin))
        .route("/admin/students", get(admin::list_students).post(admin::upload_students))
        .route("/admin/projects", get(admin::list_projects).post(admin::create_project))
        .route("/admin/projects/{id}/best", patch(admin::toggle_best_project))
        .route("/admin/projects/{id}/status", patch(admin::set_project_status))
        .route("/admin/panels/auto-create", post(panels::auto_create))
        .route("/admin/panels/auto-assign", post(panels::auto_assign))
        .route("/admin/panels/{id}", put(panels::update).delete(panels::delete))
        .route("/admin/panels/{id}/members", put(panels::update_members))
        .route(
            "/admin/department-config",
            get(admin::department_config).put(admin::save_department_config),
        )
        .route(
            "/admin/marking-schema",
            get(admin::marking_schema).put(admin::save_marking_schema),
        )
        .route("/admin/requests", get(admin::list_requests))
        .route("/admin/requests/{id}", put(admin::decide_request))
        .route(
            "/admin/broadcasts",
            get(admin::list_broadcasts).post(admin::create_broadcast),
        )
        .route(
            "/admin/broadcasts/{id}",
            put(admin::update_broadcast).delete(admin::delete_broadcast),
        )
        .route(
            "/admin/coordinators",
            get(admin::list_coordinators).post(admin::assign_coordinator),
        )
        .route("/admin/coordinators/{id}", axum::routing::delete(admin::remove_coordinator))
        .route_layer(middleware::from_fn_with_state(ADMIN, require_roles));

    let panel_routes = Router::new()
        .route("/admin/panels", get(panels::list).post(panels::create))
        .route("/admin/panels/assign", post(panels::assign))
        .route_layer(middleware::from_fn_with_state(PANEL_MANAGERS, require_roles));

    let coordinator_routes = Router::new()
        .route("/project-coordinator/projects", get(coordinator::list_projects))
        .route(
            "/project-coordinator/projects/{id}/reassign-guide",
            put(coordinator::reassign_guide),
        )
        .route("/project-coordinator/panels/assign", post(coordinator::assign_panel))
        .route_layer(middleware::from_fn_with_state(COORDINATOR, require_roles));

    let faculty_routes = Router::new()
        .route("/faculty/marking-schema", get(faculty::marking_schema))
        .route("/faculty/broadcasts", get(faculty::broadcasts))
        .route("/faculty/requests", post(faculty::create_request))
        .route("/faculty/marks", get(faculty::marks).post(faculty::save_marks))
        .route_layer(middleware::from_fn_with_state(FACULTY, require_roles));

    Router::new()
        .route("/health", get(health::health))
        .merge(admin_routes)
        .merge(panel_routes)
        .merge(coordinator_routes)
        .merge(faculty_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

pub async fn serve(addr: &str, store: Store) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr, "listening");
    axum::serve(listener, create_app(store)).await
}

#[cfg(test)]
mod tests {
    use super::guard::{USER_ID_HEADER, USER_ROLE_HEADER};
    use super::*;
    use crate::model::NewCoordinator;
    use crate::store::fixtures;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        user: Option<(&str, &str)>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some((employee_id, role)) = user {
            builder = builder
                .header(USER_ID_HEADER, employee_id)
                .header(USER_ROLE_HEADER, role);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    const ADMIN_USER: Option<(&str, &str)> = Some(("A001", "admin"));

    #[tokio::test]
    async fn test_health_is_open() {
        let app = create_app(fixtures::store().await);
        let (status, body) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_guard() {
        let app = create_app(fixtures::store().await);
        let (status, body) = send(&app, Method::GET, "/admin/faculty", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"success": false, "message": "Authentication required."}));
        let (status, body) = send(
            &app,
            Method::GET,
            "/admin/faculty",
            Some(("F001", "faculty")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Access denied.");
        let (status, _) = send(
            &app,
            Method::GET,
            "/admin/panels",
            Some(("F001", "project_coordinator")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(
            &app,
            Method::DELETE,
            "/admin/panels/1",
            Some(("F001", "project_coordinator")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_create_faculty_trims_input() {
        let app = create_app(fixtures::store().await);
        let (status, body) = send(
            &app,
            Method::POST,
            "/admin/faculty",
            ADMIN_USER,
            Some(json!({
                "employeeId": "  F010 ",
                "name": " Asha Rao ",
                "emailId": "asha@example.edu",
                "specialization": ["AI"],
                "school": ["SCOPE"],
                "department": ["CSE"]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["employeeId"], "F010");
        assert_eq!(body["data"]["name"], "Asha Rao");
        let (status, body) = send(&app, Method::GET, "/admin/faculty", ADMIN_USER, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
    }

    #[tokio::test]
    async fn test_assign_full_panel() {
        let store = fixtures::store().await;
        fixtures::faculty(&store, "F001", &["AI"]).await;
        fixtures::faculty(&store, "F002", &["AI"]).await;
        let panel = fixtures::panel(&store, &["F001"], &["AI"], 1).await;
        let first = fixtures::project(&store, "A", "F002", Some("AI")).await;
        let second = fixtures::project(&store, "B", "F002", Some("AI")).await;
        let app = create_app(store);
        let (status, _) = send(
            &app,
            Method::POST,
            "/admin/panels/assign",
            ADMIN_USER,
            Some(json!({"panelId": panel.id, "projectId": first.id})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(
            &app,
            Method::POST,
            "/admin/panels/assign",
            ADMIN_USER,
            Some(json!({"panelId": panel.id, "projectId": second.id})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Panel has reached maximum capacity.");
        let (status, body) = send(
            &app,
            Method::DELETE,
            &format!("/admin/panels/{}", panel.id),
            ADMIN_USER,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Cannot delete panel with 1 assigned projects.");
    }

    #[tokio::test]
    async fn test_coordinator_panel_routes_are_scoped() {
        let store = fixtures::store().await;
        fixtures::faculty(&store, "C001", &[]).await;
        fixtures::faculty(&store, "F001", &["AI"]).await;
        fixtures::faculty(&store, "F002", &["AI"]).await;
        let panel = fixtures::panel(&store, &["F001"], &["AI"], 2).await;
        let project = fixtures::project(&store, "A", "F002", Some("AI")).await;
        let app = create_app(store.clone());
        let coordinator = Some(("C001", "project_coordinator"));
        let assign = json!({"panelId": panel.id, "projectId": project.id});
        for uri in ["/admin/panels/assign", "/project-coordinator/panels/assign"] {
            let (status, body) = send(&app, Method::POST, uri, coordinator, Some(assign.clone())).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
            assert_eq!(body["message"], "Access denied.");
        }
        let new_panel = json!({
            "memberEmployeeIds": ["F002"],
            "academicYear": "2025-26",
            "school": "SCOPE",
            "department": "CSE",
            "venue": "SJT 302",
            "specializations": ["AI"]
        });
        let (status, _) = send(
            &app,
            Method::POST,
            "/admin/panels",
            coordinator,
            Some(new_panel.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(store.project(project.id).await.unwrap().panel.is_none());

        store
            .assign_coordinator(NewCoordinator {
                employee_id: "C001".into(),
                scope: fixtures::scope(),
                is_primary: true,
            })
            .await
            .unwrap();
        let (status, _) = send(&app, Method::POST, "/admin/panels/assign", coordinator, Some(assign)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(store.project(project.id).await.unwrap().panel, Some(panel.id));
        let (status, _) = send(&app, Method::POST, "/admin/panels", coordinator, Some(new_panel)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_auto_create_report() {
        let store = fixtures::store().await;
        for id in ["F001", "F002", "F003"] {
            fixtures::faculty(&store, id, &["AI"]).await;
        }
        let app = create_app(store);
        let (status, body) = send(
            &app,
            Method::POST,
            "/admin/panels/auto-create",
            ADMIN_USER,
            Some(json!({
                "departments": ["CSE", "ECE"],
                "school": "SCOPE",
                "academicYear": "2025-26"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Created 1 panels.");
        let report = &body["data"];
        assert_eq!(report["created"], 1);
        assert_eq!(report["errors"], 1);
        assert_eq!(report["panels"][0]["panelName"], "CSE-AI-1");
        assert_eq!(
            report["details"],
            json!([{"department": "ECE", "error": "Not enough faculty. Need 3, found 0"}])
        );
        let (_, body) = send(&app, Method::GET, "/admin/panels", ADMIN_USER, None).await;
        assert_eq!(body["count"], 1);
    }

    #[tokio::test]
    async fn test_auto_assign_report() {
        let store = fixtures::store().await;
        fixtures::faculty(&store, "F001", &["AI"]).await;
        fixtures::faculty(&store, "F002", &["AI"]).await;
        let panel = fixtures::panel(&store, &["F001"], &["AI"], 1).await;
        let first = fixtures::project(&store, "A", "F002", Some("AI")).await;
        let second = fixtures::project(&store, "B", "F002", Some("AI")).await;
        let general = fixtures::project(&store, "C", "F002", None).await;
        let app = create_app(store);
        let (status, body) = send(
            &app,
            Method::POST,
            "/admin/panels/auto-assign",
            ADMIN_USER,
            Some(json!({"academicYear": "2025-26", "school": "SCOPE", "department": "CSE"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let report = &body["data"];
        assert_eq!(report["assigned"], 1);
        assert_eq!(report["errors"], 2);
        assert_eq!(
            report["assignments"],
            json!([{"projectId": first.id, "panelId": panel.id}])
        );
        assert_eq!(
            report["details"],
            json!([
                {"projectId": second.id, "error": "No available panel found"},
                {"projectId": general.id, "error": "No available panel found"}
            ])
        );
        assert!(report.get("created").is_none());
    }

    #[tokio::test]
    async fn test_project_status_route() {
        let store = fixtures::store().await;
        fixtures::faculty(&store, "F001", &[]).await;
        let project = fixtures::project(&store, "A", "F001", None).await;
        let app = create_app(store);
        let uri = format!("/admin/projects/{}/status", project.id);
        let (status, body) = send(&app, Method::PATCH, &uri, ADMIN_USER, Some(json!({"status": "completed"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "completed");
        let (_, body) = send(&app, Method::GET, "/admin/projects?status=completed", ADMIN_USER, None).await;
        assert_eq!(body["count"], 1);
        let (status, _) = send(&app, Method::PATCH, &uri, ADMIN_USER, Some(json!({"status": "archived"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(
            &app,
            Method::PATCH,
            "/admin/projects/999/status",
            ADMIN_USER,
            Some(json!({"status": "completed"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_short_team_comment_is_rejected() {
        let store = fixtures::store().await;
        fixtures::faculty(&store, "F001", &["AI"]).await;
        let project = fixtures::project(&store, "A", "F001", Some("AI")).await;
        let app = create_app(store);
        let submission = |comment: &str| {
            json!({
                "projectId": project.id,
                "review": "review1",
                "students": [],
                "teamComment": comment,
                "pptApproved": false
            })
        };
        let faculty = Some(("F001", "faculty"));
        let (status, body) = send(
            &app,
            Method::POST,
            "/faculty/marks",
            faculty,
            Some(submission("   too short   ")),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Team comments are required (min 10 chars).");
        let (status, body) = send(
            &app,
            Method::POST,
            "/faculty/marks",
            faculty,
            Some(submission("exactly 10")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Marks saved successfully.");
    }

    #[tokio::test]
    async fn test_request_decision_message() {
        let store = fixtures::store().await;
        fixtures::faculty(&store, "F001", &[]).await;
        fixtures::faculty(&store, "A001", &[]).await;
        let app = create_app(store);
        let (status, body) = send(
            &app,
            Method::POST,
            "/faculty/requests",
            Some(("F001", "faculty")),
            Some(json!({"kind": "unlock_marks", "reason": "Typo in review 1 marks"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["data"]["id"].as_i64().unwrap();
        let (status, body) = send(
            &app,
            Method::PUT,
            &format!("/admin/requests/{id}"),
            ADMIN_USER,
            Some(json!({"status": "approved", "remarks": "ok"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Request approved successfully.");
        assert_eq!(body["data"]["status"], "approved");
    }

    #[tokio::test]
    async fn test_missing_resources_are_404() {
        let app = create_app(fixtures::store().await);
        let (status, body) = send(
            &app,
            Method::GET,
            "/admin/marking-schema?academicYear=2025-26&school=SCOPE&department=CSE",
            ADMIN_USER,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Marking schema not found.");
    }
}
