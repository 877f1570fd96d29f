//! Spoken broadcast for a newly dispatched ticket.

use crate::ticket::Ticket;
use crate::types::TicketId;

/// BCP-47 tag of the operating language.
pub const SPEECH_LANGUAGE: &str = "id-ID";

/// The fields of a ticket that are read out loud.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub ticket_id: TicketId,
    pub station: String,
    pub model: String,
    pub ng_id: String,
    pub tech_type: String,
}

impl From<&Ticket> for Announcement {
    fn from(ticket: &Ticket) -> Self {
        Self {
            ticket_id: ticket.id.clone(),
            station: ticket.station.clone(),
            model: ticket.model.clone(),
            ng_id: ticket.ng_id.clone(),
            tech_type: ticket.tech_type.clone(),
        }
    }
}

impl Announcement {
    /// Full sentence handed to the speech provider.
    ///
    /// The call is repeated once so technicians away from the speaker still
    /// catch it.
    pub fn text(&self) -> String {
        let code = speakable_code(&self.ng_id);
        let Announcement {
            station,
            model,
            tech_type,
            ..
        } = self;

        format!(
            "Perhatian. Panggilan kepada {tech_type} harap segera ke {station} untuk model {model}. \
             Masalah terdeteksi {code}. Mohon segera menuju lokasi. Sekali lagi. \
             Panggilan kepada {tech_type} dibutuhkan pada {station} untuk model {model}. \
             Masalah terdeteksi {code}. Mohon segera menuju lokasi. Terima kasih."
        )
    }
}

/// Defect codes like `0.01` are read with the dot spoken as "titik".
pub fn speakable_code(code: &str) -> String {
    code.replace('.', " titik ")
}
