//! Integration tests per GET /api/reports/summary

mod common;

#[cfg(test)]
mod report_tests {
    use super::common::*;
    use axum::http::StatusCode;
    use chrono::{TimeZone, Utc};
    use naf_contabil::dtos::{CreateAttendanceDTO, CreateDemandDTO};
    use naf_contabil::entities::Role;
    use naf_contabil::repositories::Create;
    use serde_json::Value;

    #[tokio::test]
    async fn test_summary_aggregates_period() {
        let state = create_test_state();
        let client = seed_user(&state, "Ana", "ana@example.com", Role::Client).await;
        let coordinator = seed_user(&state, "Carla", "carla@naf.br", Role::Coordinator).await;
        let pedro = seed_user(&state, "Pedro", "pedro@naf.br", Role::Student).await;
        let julia = seed_user(&state, "Julia", "julia@naf.br", Role::Student).await;
        let irpf = seed_service(&state, "IRPF").await;
        let mei = seed_service(&state, "MEI").await;

        let march = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        let june = Utc.with_ymd_and_hms(2026, 6, 10, 12, 0, 0).unwrap();
        let mut demand_ids = Vec::new();
        for (i, (service_id, created_at)) in [
            (irpf.service_id, march),
            (irpf.service_id, march),
            (mei.service_id, march),
            (mei.service_id, june),
        ]
        .into_iter()
        .enumerate()
        {
            let demand = state
                .demands
                .create(&CreateDemandDTO {
                    protocol: format!("NAF20260310-00000{i}"),
                    client_id: client.user_id,
                    service_id,
                    description: "Ajuda".to_string(),
                    created_at,
                })
                .await
                .unwrap();
            demand_ids.push(demand.demand_id);
        }

        for (attendant_id, minutes, attended_at) in [
            (pedro.user_id, 30, march),
            (julia.user_id, 50, march),
            (pedro.user_id, 40, march),
            (julia.user_id, 90, june),
        ] {
            state
                .attendances
                .create(&CreateAttendanceDTO {
                    demand_id: demand_ids[0],
                    attendant_id,
                    description: "Atendimento".to_string(),
                    duration_minutes: minutes,
                    attended_at,
                })
                .await
                .unwrap();
        }

        let server = create_test_server(state.clone());
        let response = server
            .get("/api/reports/summary?from=2026-03-01T00:00:00Z&to=2026-03-31T23:59:59Z")
            .authorization_bearer(create_test_jwt(&coordinator))
            .await;
        response.assert_status_ok();
        let report: Value = response.json();

        assert_eq!(report["demands_total"], 3);
        assert_eq!(report["demands_by_status"]["Pending"], 3);
        assert_eq!(report["demands_by_service"][0]["name"], "IRPF");
        assert_eq!(report["demands_by_service"][0]["count"], 2);
        assert_eq!(report["demands_by_service"][1]["name"], "MEI");
        assert_eq!(report["attendances_total"], 3);
        assert_eq!(report["attendance_minutes_total"], 120);
        // Pedro 70 minuti, Julia 50
        assert_eq!(report["attendants"][0]["name"], "Pedro");
        assert_eq!(report["attendants"][0]["minutes"], 70);
        assert_eq!(report["attendants"][0]["attendances"], 2);
        assert_eq!(report["attendants"][1]["name"], "Julia");

        let all: Value = server
            .get("/api/reports/summary")
            .authorization_bearer(create_test_jwt(&coordinator))
            .await
            .json();
        assert_eq!(all["demands_total"], 4);
        assert_eq!(all["attendance_minutes_total"], 210);
        assert_eq!(all["attendants"][0]["name"], "Julia");
    }

    #[tokio::test]
    async fn test_summary_access_and_range() {
        let state = create_test_state();
        let teacher = seed_user(&state, "Prof", "prof@naf.br", Role::Teacher).await;
        let student = seed_user(&state, "Pedro", "pedro@naf.br", Role::Student).await;
        let server = create_test_server(state.clone());

        server
            .get("/api/reports/summary")
            .authorization_bearer(create_test_jwt(&student))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let empty: Value = server
            .get("/api/reports/summary")
            .authorization_bearer(create_test_jwt(&teacher))
            .await
            .json();
        assert_eq!(empty["demands_total"], 0);
        assert!(empty["attendants"].as_array().unwrap().is_empty());

        server
            .get("/api/reports/summary?from=2026-05-01T00:00:00Z&to=2026-04-01T00:00:00Z")
            .authorization_bearer(create_test_jwt(&teacher))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        server
            .get("/api/reports/summary?from=ieri")
            .authorization_bearer(create_test_jwt(&teacher))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}
