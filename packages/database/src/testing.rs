//! Behavior every [`Store`] implementation must share.

use chrono::Utc;
use safety_map_geography_models::{AreaShape, AreaType};
use safety_map_incident_models::{
    Actor, AlertLevel, Auditor, Incident, IncidentFilter, IncidentStatus, NewIncident, Role,
};
use safety_map_region_models::{NewRegion, Region};

use crate::Store;

pub fn incident(id: &str, kind: &str, region_id: Option<&str>) -> Incident {
    let reporter = Actor {
        id: "u1".to_string(),
        email: "u1@example.com".to_string(),
        role: Role::User,
    };
    let mut incident = Incident::new(
        id.to_string(),
        &reporter,
        NewIncident {
            area_type: AreaType::Point,
            coordinates: AreaShape::point(36.8, -1.3),
            incident_type: kind.to_string(),
            description: "Broken street lights".to_string(),
            severity: None,
            images: vec!["https://img.example.com/1.jpg".to_string()],
            region_id: None,
        },
        Utc::now(),
    );
    incident.region_id = region_id.map(ToString::to_string);
    incident
}

pub fn region(id: &str, x0: f64) -> Region {
    Region::new(
        id.to_string(),
        NewRegion {
            name: Some(format!("Region {id}")),
            area_type: AreaType::Polygon,
            coordinates: AreaShape::polygon(&[[x0, 0.0], [x0 + 1.0, 0.0], [x0 + 1.0, 1.0]]),
            cluster_factor: None,
        },
        1.0,
        Utc::now(),
    )
}

pub async fn exercise_incidents(store: &dyn Store) {
    assert!(store.get_incident("a").await.unwrap().is_none());

    store
        .save_incident(&incident("a", "gbv", Some("r1")))
        .await
        .unwrap();
    store
        .save_incident(&incident("b", "no_lights", Some("r2")))
        .await
        .unwrap();
    store
        .save_incident(&incident("c", "gbv", Some("r1")))
        .await
        .unwrap();

    // Upsert keeps the original position.
    let mut a = store.get_incident("a").await.unwrap().unwrap();
    a.status = IncidentStatus::Verified;
    a.contribution_score = 3.75;
    store.save_incident(&a).await.unwrap();

    let stored = store.get_incident("a").await.unwrap().unwrap();
    assert_eq!(stored, a);

    let in_r1: Vec<String> = store
        .incidents_in_region("r1")
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.id)
        .collect();
    assert_eq!(in_r1, vec!["a", "c"]);

    let all = store
        .list_incidents(&IncidentFilter::default())
        .await
        .unwrap();
    assert_eq!(
        all.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(),
        vec!["a", "b", "c"]
    );

    let verified = store
        .list_incidents(&IncidentFilter {
            status: Some(IncidentStatus::Verified),
            ..IncidentFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(verified.len(), 1);

    let gbv = store
        .list_incidents(&IncidentFilter {
            incident_type: Some("gbv".to_string()),
            limit: 1,
            ..IncidentFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(gbv.len(), 1);
    assert_eq!(gbv[0].id, "a");

    let alerts = store
        .list_incidents(&IncidentFilter {
            alert_level: Some(AlertLevel::HighAlert),
            ..IncidentFilter::default()
        })
        .await
        .unwrap();
    assert!(alerts.is_empty());

    assert!(store.delete_incident("a").await.unwrap());
    assert!(!store.delete_incident("a").await.unwrap());
    assert_eq!(store.incidents_in_region("r1").await.unwrap().len(), 1);
}

pub async fn exercise_regions(store: &dyn Store) {
    assert!(store.list_regions().await.unwrap().is_empty());

    for (id, x0) in [("r2", 0.0), ("r1", 2.0), ("r3", 4.0)] {
        store.save_region(&region(id, x0)).await.unwrap();
    }

    let mut r1 = store.get_region("r1").await.unwrap().unwrap();
    r1.stats.incident_count = 2;
    r1.stats.incident_types.insert("gbv".to_string(), 2);
    r1.stats.raw_score = 5.0;
    store.save_region(&r1).await.unwrap();

    assert_eq!(store.get_region("r1").await.unwrap().unwrap(), r1);
    assert!(store.get_region("nope").await.unwrap().is_none());

    let order: Vec<String> = store
        .list_regions()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(order, vec!["r2", "r1", "r3"]);
}

pub async fn exercise_auditors(store: &dyn Store) {
    assert!(store.get_auditor("ngo1").await.unwrap().is_none());

    let mut auditor = Auditor {
        actor: Actor {
            id: "ngo1".to_string(),
            email: "field@ngo.example.org".to_string(),
            role: Role::Ngo,
        },
        verified_count: 3,
        flagged_count: 1,
    };
    store.save_auditor(&auditor).await.unwrap();
    auditor.verified_count = 4;
    store.save_auditor(&auditor).await.unwrap();

    assert_eq!(store.get_auditor("ngo1").await.unwrap(), Some(auditor));
}
