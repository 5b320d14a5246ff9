use sqlx::PgPool;

use crate::error::{DbError, Result};
use crate::models::Setting;

#[derive(Clone)]
pub struct SettingsRepo {
    pool: PgPool,
}

/// One row to seed on first boot if the component has no settings yet.
pub struct SettingDefault {
    pub section: &'static str,
    pub key: &'static str,
    pub value: String,
    pub value_type: &'static str,
    pub description: &'static str,
}

impl SettingsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_all(&self, component: &str) -> Result<Vec<Setting>> {
        let settings = sqlx::query_as::<_, Setting>(
            r#"
            SELECT component, section, key, value, value_type, description
            FROM settings WHERE component = $1
            "#,
        )
        .bind(component)
        .fetch_all(&self.pool)
        .await?;
        Ok(settings)
    }

    pub async fn get_section(&self, component: &str, section: &str) -> Result<Vec<Setting>> {
        let settings = sqlx::query_as::<_, Setting>(
            r#"
            SELECT component, section, key, value, value_type, description
            FROM settings WHERE component = $1 AND section = $2
            "#,
        )
        .bind(component)
        .bind(section)
        .fetch_all(&self.pool)
        .await?;
        Ok(settings)
    }

    async fn get_one(&self, component: &str, section: &str, key: &str) -> Result<Setting> {
        sqlx::query_as::<_, Setting>(
            r#"
            SELECT component, section, key, value, value_type, description
            FROM settings WHERE component = $1 AND section = $2 AND key = $3
            "#,
        )
        .bind(component)
        .bind(section)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("setting {component}/{section}/{key} not found")))
    }

    pub async fn get_int(&self, component: &str, section: &str, key: &str) -> Result<i64> {
        let setting = self.get_one(component, section, key).await?;
        setting
            .value
            .parse()
            .map_err(|_| DbError::Validation(format!("setting {key} is not an int")))
    }

    pub async fn get_float(&self, component: &str, section: &str, key: &str) -> Result<f64> {
        let setting = self.get_one(component, section, key).await?;
        setting
            .value
            .parse()
            .map_err(|_| DbError::Validation(format!("setting {key} is not a float")))
    }

    pub async fn get_bool(&self, component: &str, section: &str, key: &str) -> Result<bool> {
        let setting = self.get_one(component, section, key).await?;
        Ok(setting.value.eq_ignore_ascii_case("true"))
    }

    pub async fn get_string(&self, component: &str, section: &str, key: &str) -> Result<String> {
        Ok(self.get_one(component, section, key).await?.value)
    }

    pub async fn set(
        &self,
        component: &str,
        section: &str,
        key: &str,
        value: &str,
        value_type: &str,
        description: Option<&str>,
    ) -> Result<Setting> {
        let setting = sqlx::query_as::<_, Setting>(
            r#"
            INSERT INTO settings (component, section, key, value, value_type, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (component, section, key) DO UPDATE SET
                value = EXCLUDED.value,
                value_type = EXCLUDED.value_type,
                description = COALESCE(EXCLUDED.description, settings.description)
            RETURNING component, section, key, value, value_type, description
            "#,
        )
        .bind(component)
        .bind(section)
        .bind(key)
        .bind(value)
        .bind(value_type)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;
        Ok(setting)
    }

    pub async fn delete(&self, component: &str, section: &str, key: &str) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM settings WHERE component = $1 AND section = $2 AND key = $3",
        )
        .bind(component)
        .bind(section)
        .bind(key)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Seeds `defaults` for `component` only if it has no settings rows
    /// at all yet, so operator edits made between restarts are never
    /// clobbered.
    pub async fn populate_defaults(
        &self,
        component: &str,
        defaults: &[SettingDefault],
    ) -> Result<()> {
        let existing = self.get_all(component).await?;
        if !existing.is_empty() {
            return Ok(());
        }

        for default in defaults {
            self.set(
                component,
                default.section,
                default.key,
                &default.value,
                default.value_type,
                Some(default.description),
            )
            .await?;
        }

        Ok(())
    }
}

/// The `rag` component's defaults, seeded on first boot.
pub fn rag_defaults(config: &ytrag_core::config::RagConfig) -> Vec<SettingDefault> {
    vec![
        SettingDefault {
            section: "retrieval",
            key: "top_k",
            value: config.top_k.to_string(),
            value_type: "int",
            description: "Number of chunks retrieved per query",
        },
        SettingDefault {
            section: "retrieval",
            key: "vector_weight",
            value: config.vector_weight.to_string(),
            value_type: "float",
            description: "Weight applied to vector similarity score",
        },
        SettingDefault {
            section: "retrieval",
            key: "text_weight",
            value: config.text_weight.to_string(),
            value_type: "float",
            description: "Weight applied to full-text rank score",
        },
        SettingDefault {
            section: "llm",
            key: "temperature",
            value: config.llm_temperature.to_string(),
            value_type: "float",
            description: "Sampling temperature for answer generation",
        },
        SettingDefault {
            section: "retrieval",
            key: "max_summaries_per_video",
            value: config.max_summaries_per_video.to_string(),
            value_type: "int",
            description: "Cap on summaries fetched per video for CONTENT_GLOBAL",
        },
        SettingDefault {
            section: "retrieval",
            key: "channel_scope_limit",
            value: config.channel_scope_limit.to_string(),
            value_type: "int",
            description: "Cap on videos drawn into scope when a question names none explicitly",
        },
    ]
}

/// The `worker` component's defaults, seeded on first boot.
pub fn worker_defaults(config: &ytrag_core::config::PipelineConfig) -> Vec<SettingDefault> {
    vec![
        SettingDefault {
            section: "pipeline",
            key: "max_videos_cap",
            value: config.max_videos_cap.to_string(),
            value_type: "int",
            description: "Hard cap on videos processed per pipeline task",
        },
        SettingDefault {
            section: "pipeline",
            key: "embed_batch_size",
            value: config.embed_batch_size.to_string(),
            value_type: "int",
            description: "Batch size for the embed stage",
        },
    ]
}
