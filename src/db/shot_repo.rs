use serde::Serialize;
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::StoreError;
use crate::models::{ShotAssessment, ShotObservation};
use crate::timestamp;

/// Who a stored analysis belongs to.
#[derive(Debug, Clone)]
pub struct ShotOwner {
    pub revier_id: String,
    pub user_id: String,
}

impl Default for ShotOwner {
    fn default() -> Self {
        Self {
            revier_id: "default".to_string(),
            user_id: "anonymous".to_string(),
        }
    }
}

/// Ids of the rows written by [`ShotAnalysisRepository::record`].
#[derive(Debug, Clone)]
pub struct RecordedAnalysis {
    pub analysis_id: String,
    pub eintrag_id: String,
}

/// One row of the analysis history.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub id: String,
    pub hit_zone: Option<String>,
    pub confidence: Option<f64>,
    pub wait_time_optimal: Option<i64>,
    pub dog_required: bool,
    pub created_at: String,
    pub wildart: Option<String>,
}

pub struct ShotAnalysisRepository {
    pool: SqlitePool,
}

impl ShotAnalysisRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Stores an assessment as a hunting-log entry of type `shot_analysis`
    /// plus its `shot_analysis` row, in one transaction.
    pub async fn record(
        &self,
        observation: &ShotObservation,
        assessment: &ShotAssessment,
        owner: &ShotOwner,
    ) -> Result<RecordedAnalysis, StoreError> {
        let analysis_id = Uuid::new_v4().to_string();
        let eintrag_id = Uuid::new_v4().to_string();
        let now = timestamp::now();
        let details = json!({
            "distance": observation.distance,
            "direction": observation.direction,
            "wildReaction": observation.wild_reaction,
        })
        .to_string();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO eintraege (
                id, revier_id, user_id, typ, zeitpunkt, wildart_id, wildart_name,
                details_json, erstellt_am, aktualisiert_am, erstellt_von
            ) VALUES (?, ?, ?, 'shot_analysis', ?, 'unknown', 'Unbekannt', ?, ?, ?, ?)
            "#,
        )
        .bind(&eintrag_id)
        .bind(&owner.revier_id)
        .bind(&owner.user_id)
        .bind(&now)
        .bind(&details)
        .bind(&now)
        .bind(&now)
        .bind(&owner.user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO shot_analysis (
                id, eintrag_id, hit_zone, confidence, wait_time_min, wait_time_optimal,
                wait_time_max, dog_required, dog_type, blood_color, blood_amount,
                blood_distribution, wild_reaction, erstellt_am, aktualisiert_am
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&analysis_id)
        .bind(&eintrag_id)
        .bind(assessment.hit_zone.to_string())
        .bind(assessment.confidence)
        .bind(assessment.wait_time_min)
        .bind(assessment.wait_time_optimal)
        .bind(assessment.wait_time_max)
        .bind(assessment.dog_required)
        .bind(&assessment.dog_type)
        .bind(&observation.blood_color)
        .bind(&observation.blood_amount)
        .bind(&observation.blood_distribution)
        .bind(&observation.wild_reaction)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            analysis_id = %analysis_id,
            hit_zone = %assessment.hit_zone,
            "stored shot analysis"
        );

        Ok(RecordedAnalysis {
            analysis_id,
            eintrag_id,
        })
    }

    /// Most recent analyses, optionally only those of one user.
    pub async fn history(
        &self,
        user_id: Option<&str>,
        limit: u32,
    ) -> Result<Vec<AnalysisSummary>, StoreError> {
        let rows = sqlx::query_as(
            r#"
            SELECT
                sa.id, sa.hit_zone, sa.confidence, sa.wait_time_optimal,
                COALESCE(sa.dog_required, 0) = 1 AS dog_required,
                sa.erstellt_am AS created_at, e.wildart_name AS wildart
            FROM shot_analysis sa
            JOIN eintraege e ON sa.eintrag_id = e.id
            WHERE sa.geloescht_am IS NULL AND (? IS NULL OR e.user_id = ?)
            ORDER BY sa.erstellt_am DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_db;
    use crate::models::analyze;

    fn observation(color: &str, amount: &str) -> ShotObservation {
        ShotObservation {
            blood_color: Some(color.into()),
            blood_amount: Some(amount.into()),
            wild_reaction: Some("zusammengebrochen".into()),
            distance: Some(80.0),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_record_writes_entry_and_analysis() {
        let db = test_db().await;
        let repo = ShotAnalysisRepository::new(db.pool.clone());
        let obs = observation("hell-rot", "viel");

        let recorded = repo
            .record(&obs, &analyze(&obs), &ShotOwner::default())
            .await
            .unwrap();

        let (typ, details): (String, String) =
            sqlx::query_as("SELECT typ, details_json FROM eintraege WHERE id = ?")
                .bind(&recorded.eintrag_id)
                .fetch_one(&db.pool)
                .await
                .unwrap();
        assert_eq!(typ, "shot_analysis");
        assert!(details.contains("zusammengebrochen"));

        let (hit_zone, dog): (String, i64) =
            sqlx::query_as("SELECT hit_zone, dog_required FROM shot_analysis WHERE id = ?")
                .bind(&recorded.analysis_id)
                .fetch_one(&db.pool)
                .await
                .unwrap();
        assert_eq!(hit_zone, "Blattschuss");
        assert_eq!(dog, 0);
    }

    #[tokio::test]
    async fn test_history_filters_by_user_and_limits() {
        let db = test_db().await;
        let repo = ShotAnalysisRepository::new(db.pool.clone());
        let hunter = ShotOwner {
            revier_id: "R1".into(),
            user_id: "jaeger".into(),
        };

        for _ in 0..3 {
            let obs = observation("wässrig", "wenig");
            repo.record(&obs, &analyze(&obs), &hunter).await.unwrap();
        }
        let obs = observation("hell-rot", "viel");
        repo.record(&obs, &analyze(&obs), &ShotOwner::default())
            .await
            .unwrap();

        let mine = repo.history(Some("jaeger"), 50).await.unwrap();
        assert_eq!(mine.len(), 3);
        assert!(mine.iter().all(|a| a.hit_zone.as_deref() == Some("Pansenschuss")));
        assert!(mine.iter().all(|a| a.dog_required));
        assert_eq!(mine[0].wildart.as_deref(), Some("Unbekannt"));

        assert_eq!(repo.history(None, 50).await.unwrap().len(), 4);
        assert_eq!(repo.history(None, 2).await.unwrap().len(), 2);
    }
}
