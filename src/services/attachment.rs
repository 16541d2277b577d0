//! Attachment service
//!
//! Stores uploaded files under the upload directory with a generated name
//! and keeps their metadata in the database.

use crate::config::UploadConfig;
use crate::db::repositories::{AttachmentRepository, PostRepository};
use crate::models::{Attachment, Member};
use crate::services::error::{ServiceError, ServiceResult};
use anyhow::Context;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use uuid::Uuid;

const FILE_NAME_MAX: usize = 255;

/// An uploaded file as received from the client
#[derive(Debug)]
pub struct UploadInput<'a> {
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub data: &'a [u8],
    pub post_id: Option<i64>,
}

pub struct AttachmentService {
    repo: Arc<dyn AttachmentRepository>,
    posts: Arc<dyn PostRepository>,
    config: UploadConfig,
}

impl AttachmentService {
    pub fn new(
        repo: Arc<dyn AttachmentRepository>,
        posts: Arc<dyn PostRepository>,
        config: UploadConfig,
    ) -> Self {
        Self { repo, posts, config }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.config.path
    }

    /// Validate, store and record an upload
    pub async fn upload(&self, uploader: &Member, input: UploadInput<'_>) -> ServiceResult<Attachment> {
        if !self.config.is_type_allowed(input.content_type) {
            return Err(ServiceError::validation(format!(
                "Invalid file type: {}. Allowed types: {:?}",
                input.content_type, self.config.allowed_types
            )));
        }
        if input.data.is_empty() {
            return Err(ServiceError::validation("File is empty"));
        }
        if input.data.len() as u64 > self.config.max_file_size {
            return Err(ServiceError::validation(format!(
                "File too large. Maximum size: {} bytes",
                self.config.max_file_size
            )));
        }

        if let Some(post_id) = input.post_id {
            let post = self
                .posts
                .get_by_id(post_id)
                .await?
                .filter(|p| !p.is_deleted())
                .ok_or_else(|| ServiceError::not_found("Post"))?;
            if post.author_id != uploader.id {
                return Err(ServiceError::forbidden("Attachments can only be added to your own posts"));
            }
        }

        fs::create_dir_all(&self.config.path)
            .await
            .context("Failed to create upload directory")?;

        let storage_name = format!(
            "{}.{}",
            Uuid::new_v4(),
            self.config.get_extension(input.content_type)
        );
        let stored_path = self.config.path.join(&storage_name);
        fs::write(&stored_path, input.data)
            .await
            .context("Failed to save uploaded file")?;

        let attachment = Attachment {
            id: 0,
            uploader_id: uploader.id,
            post_id: input.post_id,
            file_name: clean_file_name(input.file_name),
            content_type: input.content_type.to_string(),
            size_bytes: input.data.len() as i64,
            storage_name,
            created_at: Utc::now(),
            deleted_at: None,
        };
        let attachment = match self.repo.create(&attachment).await {
            Ok(attachment) => attachment,
            Err(e) => {
                if let Err(remove_err) = fs::remove_file(&stored_path).await {
                    tracing::warn!(
                        path = %stored_path.display(),
                        error = %remove_err,
                        "Failed to remove unrecorded upload"
                    );
                }
                return Err(e.into());
            }
        };
        tracing::info!(
            attachment_id = attachment.id,
            size = attachment.size_bytes,
            content_type = %attachment.content_type,
            "File uploaded"
        );
        Ok(attachment)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Attachment> {
        self.repo
            .get_by_id(id)
            .await?
            .filter(|a| a.deleted_at.is_none())
            .ok_or_else(|| ServiceError::not_found("Attachment"))
    }

    /// A live attachment and the path of its stored file
    pub async fn stored_file(&self, storage_name: &str) -> ServiceResult<(Attachment, PathBuf)> {
        let attachment = self
            .repo
            .get_live_by_storage_name(storage_name)
            .await?
            .ok_or_else(|| ServiceError::not_found("File"))?;
        let path = self.config.path.join(&attachment.storage_name);
        Ok((attachment, path))
    }

    pub async fn list_by_post(&self, post_id: i64) -> ServiceResult<Vec<Attachment>> {
        self.posts
            .get_by_id(post_id)
            .await?
            .filter(|p| !p.is_deleted())
            .ok_or_else(|| ServiceError::not_found("Post"))?;
        Ok(self.repo.list_by_post(post_id).await?)
    }

    pub async fn delete(&self, uploader: &Member, id: i64) -> ServiceResult<()> {
        let attachment = self.get(id).await?;
        if attachment.uploader_id != uploader.id {
            return Err(ServiceError::forbidden("Only the uploader can delete this attachment"));
        }
        if !self.repo.soft_delete(id).await? {
            return Err(ServiceError::not_found("Attachment"));
        }
        Ok(())
    }
}

/// Last path component of a client-supplied name, capped in length
fn clean_file_name(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("unnamed");
    base.chars().take(FILE_NAME_MAX).collect()
}
