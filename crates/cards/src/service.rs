use crate::models::{merge_fields, Card, CreateCardRequest, UpdateCardRequest};
use crate::repository::CardRepository;
use axum::extract::rejection::{JsonRejection, PathRejection};
use database::{Database, RepositoryError};
use tracing::instrument;
use validator::Validate;

#[derive(Debug, thiserror::Error)]
pub enum CardError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Malformed request body: {0}")]
    Rejected(#[from] JsonRejection),
    #[error("Invalid card id: {0}")]
    BadId(#[from] PathRejection),
    #[error("Database error: {0}")]
    Infrastructure(String),
    #[error("Card not found")]
    NotFound,
}

impl From<RepositoryError> for CardError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => CardError::NotFound,
            RepositoryError::Infrastructure(e) => CardError::Infrastructure(e.to_string()),
            _ => CardError::Infrastructure(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for CardError {
    fn from(errors: validator::ValidationErrors) -> Self {
        CardError::InvalidInput(errors.to_string())
    }
}

pub struct CardService;

impl CardService {
    #[instrument(skip(db))]
    pub async fn list_cards(db: &Database) -> Result<Vec<Card>, CardError> {
        let mut uow = db.begin().await?;
        let mut repo = CardRepository::new(uow.connection());

        let cards = repo.list().await?;
        Ok(cards)
    }

    #[instrument(skip(db))]
    pub async fn get_card(db: &Database, id: i64) -> Result<Card, CardError> {
        let mut uow = db.begin().await?;
        let mut repo = CardRepository::new(uow.connection());

        let card = repo.find_by_id(id).await?
            .ok_or(CardError::NotFound)?;

        Ok(card)
    }

    #[instrument(skip(db))]
    pub async fn create_card(db: &Database, req: CreateCardRequest) -> Result<Card, CardError> {
        req.validate()?;
        let fields_data = req.fields_data.unwrap_or_default();

        let mut uow = db.begin_write().await?;
        let mut repo = CardRepository::new(uow.connection());

        let id = repo.create(&req.title, &req.column, &fields_data).await?;

        uow.commit().await?;

        Ok(Card {
            id,
            title: req.title,
            column: req.column,
            fields_data,
        })
    }

    /// Applies a partial update and returns the card as stored afterwards.
    /// Incoming `fields_data` is shallow-merged onto the stored map.
    #[instrument(skip(db))]
    pub async fn update_card(
        db: &Database,
        id: i64,
        mut req: UpdateCardRequest,
    ) -> Result<Card, CardError> {
        req.validate()?;

        let mut uow = db.begin_write().await?;
        let mut repo = CardRepository::new(uow.connection());

        let current = repo.find_by_id(id).await?
            .ok_or(CardError::NotFound)?;

        if let Some(incoming) = req.fields_data.take() {
            req.fields_data = Some(merge_fields(current.fields_data, incoming));
        }

        if !repo.update(id, &req).await? {
            return Err(CardError::NotFound);
        }

        // Same transaction, so this sees the write above.
        let card = repo.find_by_id(id).await?
            .ok_or(CardError::NotFound)?;

        uow.commit().await?;
        Ok(card)
    }

    #[instrument(skip(db))]
    pub async fn delete_card(db: &Database, id: i64) -> Result<(), CardError> {
        let mut uow = db.begin_write().await?;
        let mut repo = CardRepository::new(uow.connection());

        if !repo.delete(id).await? {
            return Err(CardError::NotFound);
        }

        uow.commit().await?;
        Ok(())
    }
}
