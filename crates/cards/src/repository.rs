use crate::models::{Card, FieldsData, UpdateCardRequest};
use database::{self, RepositoryError};
use serde_json::Value;
use sqlx::{FromRow, QueryBuilder};

#[derive(FromRow)]
struct CardRecord {
    id: i64,
    title: String,
    column: String,
    fields_data: Option<String>,
}

impl From<CardRecord> for Card {
    fn from(record: CardRecord) -> Self {
        let fields_data = decode_fields(record.id, record.fields_data.as_deref());
        Card {
            id: record.id,
            title: record.title,
            column: record.column,
            fields_data,
        }
    }
}

/// Stored text that is missing, unreadable, or not a JSON object becomes an
/// empty map. A bad row must never fail the whole read.
fn decode_fields(id: i64, raw: Option<&str>) -> FieldsData {
    let Some(text) = raw.filter(|t| !t.trim().is_empty()) else {
        return FieldsData::new();
    };

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => map,
        Ok(Value::Null) => FieldsData::new(),
        Ok(_) => {
            tracing::warn!(card_id = id, "fields_data is not a JSON object, ignoring");
            FieldsData::new()
        }
        Err(e) => {
            tracing::warn!(card_id = id, "Unreadable fields_data: {}", e);
            FieldsData::new()
        }
    }
}

pub(crate) struct CardRepository<'a> {
    conn: &'a mut database::Connection,
}

impl<'a> CardRepository<'a> {
    pub fn new(conn: &'a mut database::Connection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &mut self,
        title: &str,
        column: &str,
        fields_data: &FieldsData,
    ) -> Result<i64, RepositoryError> {
        let encoded = serde_json::to_string(fields_data)?;

        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO cards (title, "column", fields_data) VALUES (?, ?, ?) RETURNING id"#,
        )
        .bind(title)
        .bind(column)
        .bind(encoded)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(id)
    }

    pub async fn list(&mut self) -> Result<Vec<Card>, RepositoryError> {
        let records = sqlx::query_as::<_, CardRecord>(
            r#"SELECT id, title, "column", fields_data FROM cards ORDER BY id"#,
        )
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(records.into_iter().map(|r| r.into()).collect())
    }

    pub async fn find_by_id(&mut self, id: i64) -> Result<Option<Card>, RepositoryError> {
        let record = sqlx::query_as::<_, CardRecord>(
            r#"SELECT id, title, "column", fields_data FROM cards WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(record.map(|r| r.into()))
    }

    pub async fn exists(&mut self, id: i64) -> Result<bool, RepositoryError> {
        let found: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM cards WHERE id = ?)")
            .bind(id)
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(found)
    }

    /// Writes only the columns present in `changes`. Returns `false` when no
    /// row has this id.
    pub async fn update(
        &mut self,
        id: i64,
        changes: &UpdateCardRequest,
    ) -> Result<bool, RepositoryError> {
        if changes.is_empty() {
            return self.exists(id).await;
        }

        let encoded = changes
            .fields_data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let mut query = QueryBuilder::<database::Driver>::new("UPDATE cards SET ");
        let mut assignments = query.separated(", ");
        if let Some(title) = &changes.title {
            assignments.push("title = ").push_bind_unseparated(title.clone());
        }
        if let Some(column) = &changes.column {
            assignments.push(r#""column" = "#).push_bind_unseparated(column.clone());
        }
        if let Some(encoded) = encoded {
            assignments.push("fields_data = ").push_bind_unseparated(encoded);
        }
        query.push(" WHERE id = ").push_bind(id);

        let result = query.build().execute(&mut *self.conn).await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&mut self, id: i64) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM cards WHERE id = ?")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::get_test_db;
    use serde_json::json;

    fn fields(value: Value) -> FieldsData {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[tokio::test]
    async fn test_create_card() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let mut repo = CardRepository::new(uow.connection());

        let data = fields(json!({"due": "2024-05-01", "points": 3}));
        let id = repo.create("Test Card", "todo", &data).await.unwrap();
        assert!(id > 0);

        let card = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(card.title, "Test Card");
        assert_eq!(card.column, "todo");
        assert_eq!(card.fields_data, data);
    }

    #[tokio::test]
    async fn test_ids_are_distinct() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let mut repo = CardRepository::new(uow.connection());

        let first = repo.create("One", "todo", &FieldsData::new()).await.unwrap();
        let second = repo.create("Two", "todo", &FieldsData::new()).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_read_cards() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let mut repo = CardRepository::new(uow.connection());

        let initial_count = repo.list().await.unwrap().len();

        let id = repo.create("Card 1", "todo", &FieldsData::new()).await.unwrap();
        repo.create("Card 2", "done", &FieldsData::new()).await.unwrap();

        let cards = repo.list().await.unwrap();
        assert_eq!(cards.len(), initial_count + 2);
        assert_eq!(cards.iter().filter(|c| c.id == id).count(), 1);
    }

    #[tokio::test]
    async fn test_find_missing_card() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let mut repo = CardRepository::new(uow.connection());

        assert!(repo.find_by_id(999).await.unwrap().is_none());
        assert!(!repo.exists(999).await.unwrap());
    }

    #[tokio::test]
    async fn test_unreadable_fields_data_reads_as_empty() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        sqlx::query(
            r#"INSERT INTO cards (id, title, "column", fields_data) VALUES
                (1, 'broken', 'todo', 'not json'),
                (2, 'null', 'todo', NULL),
                (3, 'array', 'todo', '[1, 2]')"#,
        )
        .execute(uow.connection())
        .await
        .unwrap();

        let mut repo = CardRepository::new(uow.connection());
        let cards = repo.list().await.unwrap();
        assert_eq!(cards.len(), 3);
        assert!(cards.iter().all(|c| c.fields_data.is_empty()));
    }

    #[tokio::test]
    async fn test_update_only_touches_supplied_columns() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let mut repo = CardRepository::new(uow.connection());

        let data = fields(json!({"a": 1}));
        let id = repo.create("Original Title", "todo", &data).await.unwrap();

        let changes = UpdateCardRequest {
            title: Some("Updated Title".to_string()),
            ..Default::default()
        };
        assert!(repo.update(id, &changes).await.unwrap());

        let card = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(card.title, "Updated Title");
        assert_eq!(card.column, "todo");
        assert_eq!(card.fields_data, data);

        let changes = UpdateCardRequest {
            column: Some("done".to_string()),
            fields_data: Some(fields(json!({"b": 2}))),
            ..Default::default()
        };
        assert!(repo.update(id, &changes).await.unwrap());

        let card = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(card.title, "Updated Title");
        assert_eq!(card.column, "done");
        assert_eq!(card.fields_data, fields(json!({"b": 2})));
    }

    #[tokio::test]
    async fn test_update_missing_card() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let mut repo = CardRepository::new(uow.connection());

        let changes = UpdateCardRequest {
            title: Some("Nobody".to_string()),
            ..Default::default()
        };
        assert!(!repo.update(42, &changes).await.unwrap());
        assert!(!repo.update(42, &UpdateCardRequest::default()).await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_update_reports_existing_card() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let mut repo = CardRepository::new(uow.connection());

        let id = repo.create("Still here", "todo", &FieldsData::new()).await.unwrap();
        assert!(repo.update(id, &UpdateCardRequest::default()).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_card() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let mut repo = CardRepository::new(uow.connection());

        let id = repo.create("To Be Deleted", "todo", &FieldsData::new()).await.unwrap();
        assert!(repo.find_by_id(id).await.unwrap().is_some());

        assert!(repo.delete(id).await.unwrap());
        assert!(repo.find_by_id(id).await.unwrap().is_none());
        assert!(!repo.delete(id).await.unwrap());
    }
}
