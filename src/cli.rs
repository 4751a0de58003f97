use crate::config::FileType;
use crate::downloader::Backend;
use crate::duplicates::DuplicatePolicy;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "spotify-dl",
    version,
    about = "Downloads Spotify tracks, albums and playlists with metadata tagging.",
    after_help = "Run without any arguments to enter interactive mode."
)]
pub struct Cli {
    /// URL(s) of tracks, albums or playlists to download. Append
    /// "|<TRACK NUMBERS>" to a collection URL to pick tracks, e.g.
    /// 'https://open.spotify.com/playlist/mYpl4YLi5T|1,4,15-' for the first,
    /// fourth, and fifteenth to the end. Without it, everything is
    /// downloaded.
    #[arg(short, long, num_args = 1..)]
    pub urls: Vec<String>,

    /// Filename template; recognizes {title}, {artist}, {album} and
    /// {track_num}, and may contain '/' to sort into subdirectories.
    #[arg(short, long)]
    pub filename: Option<String>,

    /// Directory where tracks are downloaded to.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Create the output directory if it does not exist.
    #[arg(short, long)]
    pub create_dir: bool,

    /// What to do when the target file already exists. Without this flag,
    /// interactive runs ask once and non-interactive runs skip.
    #[arg(short, long, value_enum)]
    pub duplicates: Option<DuplicatePolicy>,

    /// Download backend to use.
    #[arg(short, long, value_enum)]
    pub backend: Option<Backend>,

    /// Audio container to download.
    #[arg(long, value_enum)]
    pub file_type: Option<FileType>,

    /// Path to a JSON batch file containing download instructions.
    #[arg(short = 'k', long)]
    pub config_file: Option<PathBuf>,

    /// Number of times to retry failed downloads.
    #[arg(long)]
    pub retry_failed_downloads: Option<u32>,

    /// Verbose logging.
    #[arg(long)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_full_surface() {
        let cli = Cli::parse_from([
            "spotify-dl",
            "-u",
            "https://open.spotify.com/track/a",
            "https://open.spotify.com/album/b|2-5",
            "-f",
            "{track_num} - {title}",
            "-o",
            "/music",
            "-c",
            "-d",
            "append-number",
            "-b",
            "relay",
            "--file-type",
            "m4a",
            "--retry-failed-downloads",
            "3",
            "--debug",
        ]);

        assert_eq!(cli.urls.len(), 2);
        assert_eq!(cli.filename.as_deref(), Some("{track_num} - {title}"));
        assert!(cli.create_dir);
        assert_eq!(cli.duplicates, Some(DuplicatePolicy::AppendNumber));
        assert_eq!(cli.backend, Some(Backend::Relay));
        assert_eq!(cli.file_type, Some(FileType::M4a));
        assert_eq!(cli.retry_failed_downloads, Some(3));
        assert!(cli.debug);
    }

    #[test]
    fn no_arguments_is_valid() {
        let cli = Cli::parse_from(["spotify-dl"]);
        assert!(cli.urls.is_empty());
        assert!(cli.config_file.is_none());
    }
}
