//! Sender vetting.
//!
//! Mail is accepted when it carries no return-path, when the return-path is
//! the sender itself, or when the return-path belongs to a manager (who may
//! send on somebody else's behalf).

use checkin_core::{address, address::ManagerList, message::InboundMessage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
  /// Process the message on behalf of this (lower-cased) sender.
  Accept(String),
  /// No usable address; drop silently.
  Ignore,
  /// The return-path is neither the sender nor a manager.
  Reject { sender: String, return_path: String },
}

pub fn vet(message: &InboundMessage, managers: &ManagerList) -> Verdict {
  let Some(sender) = address::find_mail_address(&message.from) else {
    return Verdict::Ignore;
  };

  let return_path = match message.return_path.as_deref().map(str::trim) {
    None | Some("") => return Verdict::Accept(sender),
    Some(raw) => match address::find_mail_address(raw) {
      Some(rp) => rp,
      None => return Verdict::Ignore,
    },
  };

  if return_path == sender || managers.contains(&return_path) {
    Verdict::Accept(sender)
  } else {
    Verdict::Reject {
      sender,
      return_path,
    }
  }
}
