use crate::ticket::TicketId;

/// One line of the closing summary listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryEntry {
    /// Ticket identifier found in the PR title
    pub ticket: TicketId,
    /// Link to the ticket in the issue tracker
    pub ticket_url: String,
    /// Bitbucket PR id
    pub pr_id: u64,
    /// Link to the PR
    pub pr_url: String,
}

/// What a run produced.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Items that printed an explanation, raw diff, or inspection
    pub processed: usize,
    /// Entries for the closing summary, in listing order
    pub summary: Vec<SummaryEntry>,
}
