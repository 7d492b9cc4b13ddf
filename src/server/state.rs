use crate::extractor::Extractor;
use crate::languages::Messages;
use crate::lines::LineFormatter;

#[derive(Clone)]
pub(crate) struct ServerState<P: crate::providers::Provider + Clone> {
    pub(crate) extractor: Extractor<P>,
    pub(crate) formatter: LineFormatter,
    pub(crate) messages: Messages,
    pub(crate) lang: String,
    pub(crate) copy_ack_ms: u64,
    pub(crate) client_html: String,
}
