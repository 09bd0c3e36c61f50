use anyhow::Result;
use clap::Parser;
use mavenkit::commands::{self, Options};
use mavenkit::repository::RepositoryDescriptor;
use std::path::PathBuf;

/// mavenkit - Maven repository resolver
///
/// Resolve versions, fetch artifacts and compute classpaths from Maven
/// repositories into a local repository.
///
/// Examples:
///   mavenkit latest org.openjfx:javafx-controls
///   mavenkit fetch com.google.code.gson:gson:2.11.0
///   mavenkit classpath org.example:app:1.0 --exclude org.slf4j:*
#[derive(Parser, Debug)]
#[command(author, version = env!("MAVENKIT_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Local repository directory (also via MAVENKIT_LOCAL_REPO)
    #[arg(long = "local-repo", value_name = "PATH", global = true)]
    local_repo: Option<PathBuf>,

    /// Ignore snapshot repositories and snapshot versions
    #[arg(long = "releases-only", global = true)]
    releases_only: bool,

    /// Settings file (defaults to <config dir>/mavenkit/settings.json)
    #[arg(long = "settings", value_name = "PATH", global = true)]
    settings: Option<PathBuf>,

    /// Log what is being resolved and downloaded
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// List the versions within a range, e.g. "g:a:[1.0,2.0)"
    Versions(CoordinateArgs),

    /// Show the newest release; "g:a" means any version
    Latest(CoordinateArgs),

    /// Fetch artifacts into the local repository and print the first path
    Fetch(FetchArgs),

    /// Print the runtime classpath of an artifact
    Classpath(ClasspathArgs),

    /// Check that a repository is reachable and accepts the credentials
    Validate(RepositoryArgs),

    /// List the configured repositories
    Repos,

    /// Manage user repositories
    #[command(subcommand)]
    Repo(RepoCommands),

    /// Manage a component library
    #[command(subcommand)]
    Library(LibraryCommands),
}

#[derive(clap::Args, Debug)]
struct CoordinateArgs {
    /// group:name[:extension[:classifier]]:version
    #[arg(value_name = "COORDINATE")]
    coordinate: String,
}

#[derive(clap::Args, Debug)]
struct FetchArgs {
    /// Coordinates to fetch; the path of the first one is printed
    #[arg(value_name = "COORDINATE", required = true)]
    coordinates: Vec<String>,

    /// Only ask this repository
    #[arg(long = "repo", value_name = "ID")]
    repository: Option<String>,
}

#[derive(clap::Args, Debug)]
struct ClasspathArgs {
    #[arg(value_name = "COORDINATE")]
    coordinate: String,

    /// Only ask this repository
    #[arg(long = "repo", value_name = "ID")]
    repository: Option<String>,

    /// Leave out group:name (wildcards allowed), repeatable
    #[arg(long = "exclude", value_name = "GROUP:NAME")]
    excludes: Vec<String>,
}

#[derive(clap::Args, Debug)]
struct RepositoryArgs {
    #[arg(long)]
    id: String,

    #[arg(long)]
    url: String,

    /// Repository layout
    #[arg(long = "type", default_value = "default")]
    layout: String,

    #[arg(long, requires = "password")]
    username: Option<String>,

    #[arg(long, requires = "username", env = "MAVENKIT_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

impl RepositoryArgs {
    fn descriptor(&self) -> RepositoryDescriptor {
        let descriptor = RepositoryDescriptor::new(&self.id, &self.url).with_layout(&self.layout);
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => descriptor.with_credentials(username, password),
            _ => descriptor,
        }
    }
}

#[derive(clap::Subcommand, Debug)]
enum RepoCommands {
    /// Validate a repository and save it to the settings
    Add(RepositoryArgs),
}

#[derive(clap::Subcommand, Debug)]
enum LibraryCommands {
    /// List the jars, FXML files and folders of a library
    List {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },

    /// Fetch an artifact and link its jar into the library
    Add {
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        #[arg(value_name = "COORDINATE")]
        coordinate: String,

        /// Only ask this repository
        #[arg(long = "repo", value_name = "ID")]
        repository: Option<String>,
    },

    /// Remove a jar, FXML file or folder from the library
    Remove {
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Resolve the library's jars again and print them
    Resolve {
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Only ask this repository
        #[arg(long = "repo", value_name = "ID")]
        repository: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let runtime = mavenkit::runtime::RealRuntime;
    let options = Options {
        settings: cli.settings,
        local_repo: cli.local_repo,
        releases_only: cli.releases_only,
    };

    match cli.command {
        Commands::Versions(args) => commands::versions(runtime, &options, &args.coordinate).await?,
        Commands::Latest(args) => commands::latest(runtime, &options, &args.coordinate).await?,
        Commands::Fetch(args) => {
            commands::fetch(runtime, &options, &args.coordinates, args.repository.as_deref()).await?
        }
        Commands::Classpath(args) => {
            commands::classpath(
                runtime,
                &options,
                &args.coordinate,
                args.repository.as_deref(),
                &args.excludes,
            )
            .await?
        }
        Commands::Validate(args) => commands::validate(runtime, &options, &args.descriptor()).await?,
        Commands::Repos => commands::repos(runtime, &options)?,
        Commands::Repo(RepoCommands::Add(args)) => {
            commands::repo_add(runtime, &options, args.descriptor()).await?
        }
        Commands::Library(LibraryCommands::List { dir }) => commands::library_list(runtime, &dir)?,
        Commands::Library(LibraryCommands::Add {
            dir,
            coordinate,
            repository,
        }) => {
            commands::library_add(runtime, &options, &dir, &coordinate, repository.as_deref()).await?
        }
        Commands::Library(LibraryCommands::Remove { dir, path }) => {
            commands::library_remove(runtime, &dir, &path)?
        }
        Commands::Library(LibraryCommands::Resolve { dir, repository }) => {
            commands::library_resolve(runtime, &options, &dir, repository.as_deref()).await?
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_versions_parsing() {
        let cli = Cli::try_parse_from(["mavenkit", "versions", "g:a:[1.0,2.0)"]).unwrap();
        match cli.command {
            Commands::Versions(args) => assert_eq!(args.coordinate, "g:a:[1.0,2.0)"),
            _ => panic!("Expected Versions command"),
        }
        assert_eq!(cli.local_repo, None);
        assert!(!cli.releases_only);
    }

    #[test]
    fn test_cli_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "mavenkit",
            "latest",
            "g:a",
            "--local-repo",
            "/tmp/m2",
            "--releases-only",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.local_repo, Some(PathBuf::from("/tmp/m2")));
        assert!(cli.releases_only);
        assert!(cli.verbose);
    }

    #[test]
    fn test_cli_fetch_parsing() {
        let cli =
            Cli::try_parse_from(["mavenkit", "fetch", "g:a:1.0", "g:a:pom:1.0", "--repo", "central"])
                .unwrap();
        match cli.command {
            Commands::Fetch(args) => {
                assert_eq!(args.coordinates, vec!["g:a:1.0", "g:a:pom:1.0"]);
                assert_eq!(args.repository.as_deref(), Some("central"));
            }
            _ => panic!("Expected Fetch command"),
        }
    }

    #[test]
    fn test_cli_fetch_requires_coordinate() {
        assert!(Cli::try_parse_from(["mavenkit", "fetch"]).is_err());
    }

    #[test]
    fn test_cli_classpath_excludes() {
        let cli = Cli::try_parse_from([
            "mavenkit",
            "classpath",
            "g:a:1.0",
            "--exclude",
            "g:b",
            "--exclude",
            "org.slf4j:*",
        ])
        .unwrap();
        match cli.command {
            Commands::Classpath(args) => assert_eq!(args.excludes, vec!["g:b", "org.slf4j:*"]),
            _ => panic!("Expected Classpath command"),
        }
    }

    #[test]
    fn test_cli_repo_add_with_credentials() {
        let cli = Cli::try_parse_from([
            "mavenkit",
            "repo",
            "add",
            "--id",
            "corp",
            "--url",
            "https://repo.corp/maven",
            "--username",
            "joe",
            "--password",
            "secret",
        ])
        .unwrap();
        match cli.command {
            Commands::Repo(RepoCommands::Add(args)) => {
                let descriptor = args.descriptor();
                assert_eq!(descriptor.id, "corp");
                assert_eq!(descriptor.layout, "default");
                assert_eq!(descriptor.credentials.unwrap().username, "joe");
            }
            _ => panic!("Expected Repo Add command"),
        }
    }

    #[test]
    fn test_cli_username_requires_password() {
        let result = Cli::try_parse_from([
            "mavenkit",
            "validate",
            "--id",
            "corp",
            "--url",
            "https://repo.corp/maven",
            "--username",
            "joe",
        ]);
        // MAVENKIT_PASSWORD may be set in the environment running the tests
        if std::env::var("MAVENKIT_PASSWORD").is_err() {
            assert!(result.is_err());
        }
    }

    #[test]
    fn test_cli_library_list_parsing() {
        let cli = Cli::try_parse_from(["mavenkit", "library", "list", "/lib"]).unwrap();
        match cli.command {
            Commands::Library(LibraryCommands::List { dir }) => {
                assert_eq!(dir, PathBuf::from("/lib"))
            }
            _ => panic!("Expected Library List command"),
        }
    }

    #[test]
    fn test_cli_library_add_and_remove_parsing() {
        let cli = Cli::try_parse_from(["mavenkit", "library", "add", "/lib", "g:a:1.0", "--repo", "central"])
            .unwrap();
        match cli.command {
            Commands::Library(LibraryCommands::Add {
                dir,
                coordinate,
                repository,
            }) => {
                assert_eq!(dir, PathBuf::from("/lib"));
                assert_eq!(coordinate, "g:a:1.0");
                assert_eq!(repository.as_deref(), Some("central"));
            }
            _ => panic!("Expected Library Add command"),
        }

        let cli = Cli::try_parse_from(["mavenkit", "library", "remove", "/lib", "/m2/a.jar"]).unwrap();
        match cli.command {
            Commands::Library(LibraryCommands::Remove { path, .. }) => {
                assert_eq!(path, PathBuf::from("/m2/a.jar"))
            }
            _ => panic!("Expected Library Remove command"),
        }

        assert!(Cli::try_parse_from(["mavenkit", "library", "add", "/lib"]).is_err());
    }

    #[test]
    fn test_cli_no_subcommand_fails() {
        assert!(Cli::try_parse_from(["mavenkit", "g:a:1.0"]).is_err());
    }
}
