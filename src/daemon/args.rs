use clap::Args;

use super::collection::source::SourceFormat;

#[derive(Args, Debug, Clone)]
pub struct TrackArgs {
    #[arg(
        long,
        value_enum,
        default_value_t = SourceFormat::NativeMessaging,
        help = "Encoding of focus events on stdin. json-lines is handy for driving the tracker by hand"
    )]
    pub format: SourceFormat,
    #[arg(long = "no-sync", help = "Keep increments local instead of mirroring them to the server")]
    pub no_sync: bool,
    #[arg(long = "server-url", help = "Aggregation service to mirror increments to")]
    pub server_url: Option<String>,
    #[arg(long = "flush-interval", help = "Seconds between periodic session flushes")]
    pub flush_interval_secs: Option<u64>,
}
