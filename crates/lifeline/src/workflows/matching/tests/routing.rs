use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use crate::workflows::fixtures::{clock, donor, engine, organ_offer, read_json_body};
use crate::workflows::matching::{matching_router, MatchingState};
use crate::workflows::registry::domain::{BloodGroup, OrganType};

fn router() -> axum::Router {
    matching_router(MatchingState {
        engine: engine(
            vec![
                donor("11", BloodGroup::OPositive, 0.05),
                donor("12", BloodGroup::OPositive, 0.01),
            ],
            vec![organ_offer("liver-1", OrganType::Liver, 2)],
        ),
        clock: clock(),
    })
}

async fn get(uri: &str) -> axum::response::Response {
    router()
        .oneshot(Request::get(uri).body(Body::empty()).expect("request"))
        .await
        .expect("route executes")
}

#[tokio::test]
async fn blood_route_ranks_donors() {
    let response = get("/api/v1/blood/donors?blood_group=O%2B&lat=19.0760&lon=72.8777&top_n=1").await;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let matches = payload["matches"].as_array().expect("matches array");
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0]["donor_id"], "12");
    assert_eq!(matches[0]["blood_group"], "O+");
    assert!(payload.get("message").is_none());
}

#[tokio::test]
async fn blood_route_explains_empty_result() {
    let response = get("/api/v1/blood/donors?blood_group=B-&lat=19.0&lon=72.8").await;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["matches"].as_array().map(Vec::len), Some(0));
    assert_eq!(payload["message"], "No eligible B- blood donors found.");
}

#[tokio::test]
async fn blood_route_rejects_bad_input() {
    for uri in [
        "/api/v1/blood/donors?blood_group=Q&lat=19&lon=72",
        "/api/v1/blood/donors?blood_group=A%2B&lon=72",
        "/api/v1/blood/donors?blood_group=A%2B&lat=north&lon=72",
        "/api/v1/blood/donors?blood_group=A%2B&lat=19&lon=72&date=26-09-2025",
        "/api/v1/blood/donors?blood_group=A%2B&lat=19&lon=72&top_n=0",
    ] {
        let response = get(uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        let payload = read_json_body(response).await;
        assert!(payload["error"].is_string(), "{uri}");
    }
}

#[tokio::test]
async fn organ_route_ranks_viable_offers() {
    let response = get("/api/v1/organ/matches?organ=liver&lat=19.1&lon=72.9").await;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["matches"][0]["offer_id"], "liver-1");
    assert_eq!(payload["matches"][0]["organ"], "Liver");
    assert_eq!(payload["matches"][0]["hours_elapsed"], 2.0);
}

#[tokio::test]
async fn organ_route_requires_organ() {
    let response = get("/api/v1/organ/matches?lat=19.1&lon=72.9").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn organ_route_reports_no_viable_offers() {
    let response = get("/api/v1/organ/matches?organ=Heart&lat=19.1&lon=72.9").await;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert!(payload["message"]
        .as_str()
        .is_some_and(|message| message.contains("Heart")));
}
