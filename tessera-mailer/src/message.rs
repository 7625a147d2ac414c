use lettre::Message;
use lettre::message::header::ContentType;

use crate::{Email, MailerError};

/// Convert an [`Email`] into a lettre message, parsing every address.
pub(crate) fn build_message(email: Email) -> Result<Message, MailerError> {
    let mut builder = Message::builder()
        .from(email.from.parse()?)
        .subject(email.subject)
        .header(ContentType::TEXT_PLAIN);

    for to in email.to {
        builder = builder.to(to.parse()?);
    }

    if let Some(reply_to) = email.reply_to {
        builder = builder.reply_to(reply_to.parse()?);
    }

    Ok(builder.body(email.text_body)?)
}
