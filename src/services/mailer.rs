use crate::config::SmtpSettings;
use crate::errors::{AppError, Result};
use crate::models::kyc::KycFile;
use crate::models::user::{User, UserDetails};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// Outgoing email used by the KYC workflow.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Tells the user their documents are being reviewed.
    async fn send_pending_email(&self, user: &User, details: &UserDetails) -> Result<()>;

    /// Forwards a payment proof to the operations team for manual review.
    async fn send_payment_proof_email(&self, user: &User, files: &[KycFile]) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub body: String,
}

/// Renders the "documents received" email in the user's language and timezone.
/// Unknown languages fall back to English.
pub fn render_pending_email(
    details: &UserDetails,
    anti_phishing_code: Option<&str>,
    now: DateTime<Utc>,
) -> RenderedEmail {
    let offset: FixedOffset = details.offset();
    let local = now.with_timezone(&offset).format("%Y-%m-%d %H:%M (UTC%:z)").to_string();

    let (subject, greeting, text, code_label) = match details.language.to_lowercase().as_str() {
        "es" => (
            "Verificación en curso",
            "Hola,",
            "Hemos recibido tus documentos y los estamos revisando. Te avisaremos cuando terminemos.",
            "Tu código antiphishing",
        ),
        "fr" => (
            "Vérification en cours",
            "Bonjour,",
            "Nous avons bien reçu vos documents et nous les examinons. Nous vous préviendrons dès que ce sera terminé.",
            "Votre code anti-hameçonnage",
        ),
        "de" => (
            "Verifizierung läuft",
            "Hallo,",
            "Wir haben Ihre Dokumente erhalten und prüfen sie gerade. Wir melden uns, sobald die Prüfung abgeschlossen ist.",
            "Ihr Anti-Phishing-Code",
        ),
        _ => (
            "Verification in progress",
            "Hello,",
            "We have received your documents and are reviewing them. We will let you know once we are done.",
            "Your anti-phishing code",
        ),
    };

    let mut body = format!("{}\n\n{}\n\n{}", greeting, text, local);
    if let Some(code) = anti_phishing_code.filter(|c| !c.is_empty()) {
        body.push_str(&format!("\n\n{}: {}", code_label, code));
    }

    RenderedEmail {
        subject: subject.to_string(),
        body,
    }
}

pub fn render_payment_proof_email(user: &User, files: &[KycFile]) -> RenderedEmail {
    let listing = files
        .iter()
        .map(|f| format!("- {} ({}, {} bytes)", f.file_name, f.content_type, f.size))
        .collect::<Vec<_>>()
        .join("\n");

    RenderedEmail {
        subject: format!("Payment proof for review: user {}", user.id),
        body: format!(
            "User {} ({}, {}) submitted a payment proof for KYC record {}.\n\nAttachments:\n{}",
            user.id,
            user.last_name,
            user.email,
            user.kyc_id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
            listing
        ),
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    operations: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
            .port(settings.port);
        if !settings.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from: settings.from_email.parse()?,
            operations: settings.operations_email.parse()?,
        })
    }

    async fn deliver(&self, message: Message) -> Result<()> {
        self.transport.send(message).await?;
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_pending_email(&self, user: &User, details: &UserDetails) -> Result<()> {
        let email = render_pending_email(details, user.anti_phishing_code.as_deref(), Utc::now());

        let message = Message::builder()
            .from(self.from.clone())
            .to(user.email.parse()?)
            .subject(email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body)?;

        self.deliver(message).await?;
        tracing::info!(section = "mailer", action = "pending_email_sent", user_id = user.id);
        Ok(())
    }

    async fn send_payment_proof_email(&self, user: &User, files: &[KycFile]) -> Result<()> {
        let email = render_payment_proof_email(user, files);

        let mut multipart = MultiPart::mixed().singlepart(SinglePart::plain(email.body));
        for file in files {
            let content_type = ContentType::parse(&file.content_type)
                .map_err(|e| AppError::EmailError(format!("Invalid attachment type {}: {}", file.content_type, e)))?;
            multipart = multipart.singlepart(Attachment::new(file.file_name.clone()).body(file.data.clone(), content_type));
        }

        let message = Message::builder()
            .from(self.from.clone())
            .reply_to(user.email.parse()?)
            .to(self.operations.clone())
            .subject(email.subject)
            .multipart(multipart)?;

        self.deliver(message).await?;
        tracing::info!(
            section = "mailer",
            action = "payment_proof_forwarded",
            user_id = user.id,
            attachments = files.len()
        );
        Ok(())
    }
}
