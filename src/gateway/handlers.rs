//! Post-confirmation handlers. Each wraps exactly one collaborator call.

use super::{replies, Gateway};
use deskbot_core::{error::DeskbotError, intent::Intent};

impl Gateway {
    /// Run the handler for a confirmed intent.
    pub(super) async fn run_handler(&self, intent: &Intent) -> Result<String, DeskbotError> {
        match intent {
            Intent::CheckActive { user_id } => self.check_user_active(user_id).await,
            Intent::ResendEmail => self.resend_welcome_email().await,
            Intent::CheckLocked { user_id } => self.check_account_locked(user_id).await,
            // Never stored as pending.
            Intent::Unknown => Ok(replies::CANNOT_HELP.to_string()),
        }
    }

    async fn check_user_active(&self, user_id: &str) -> Result<String, DeskbotError> {
        let active = self
            .bounded(
                self.directory.name(),
                self.directory.is_user_active(user_id),
            )
            .await?;
        Ok(replies::user_activity(user_id, active))
    }

    async fn resend_welcome_email(&self) -> Result<String, DeskbotError> {
        self.bounded(self.mailer.name(), self.mailer.send_welcome_email())
            .await?;
        Ok(replies::EMAIL_RESENT.to_string())
    }

    async fn check_account_locked(&self, user_id: &str) -> Result<String, DeskbotError> {
        let locked = self
            .bounded(
                self.directory.name(),
                self.directory.is_account_locked(user_id),
            )
            .await?;
        Ok(replies::account_lock(user_id, locked))
    }
}
