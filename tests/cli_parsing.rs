use clap::Parser;
use precache::cli::commands::store::StoreCommands;
use precache::cli::{Cli, Commands};

#[test]
fn test_parse_init_defaults() {
    let cli = Cli::try_parse_from(vec!["precache", "init"]).unwrap();
    match cli.command {
        Commands::Init(args) => {
            assert!(!args.force);
            assert_eq!(args.path.to_str(), Some("."));
        }
        _ => panic!("Wrong top-level command"),
    }
    assert!(!cli.json);
}

#[test]
fn test_parse_init_force_with_path() {
    let cli = Cli::try_parse_from(vec!["precache", "init", "--force", "/srv/site"]).unwrap();
    match cli.command {
        Commands::Init(args) => {
            assert!(args.force);
            assert_eq!(args.path.to_str(), Some("/srv/site"));
        }
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_populate_store_override() {
    let cli = Cli::try_parse_from(vec!["precache", "--json", "populate", "--store", "cache-v2"]).unwrap();
    assert!(cli.json);
    match cli.command {
        Commands::Populate(args) => assert_eq!(args.store.as_deref(), Some("cache-v2")),
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_resolve_defaults_to_get() {
    let cli = Cli::try_parse_from(vec!["precache", "resolve", "/download_feed"]).unwrap();
    match cli.command {
        Commands::Resolve(args) => {
            assert_eq!(args.url, "/download_feed");
            assert_eq!(args.method, "GET");
            assert!(args.header.is_empty());
            assert!(!args.body);
        }
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_resolve_repeated_headers() {
    let cli = Cli::try_parse_from(vec![
        "precache",
        "resolve",
        "/",
        "-X",
        "POST",
        "-H",
        "Accept: text/html",
        "-H",
        "Accept-Language: en",
        "--body",
    ])
    .unwrap();
    match cli.command {
        Commands::Resolve(args) => {
            assert_eq!(args.method, "POST");
            assert_eq!(args.header, vec!["Accept: text/html", "Accept-Language: en"]);
            assert!(args.body);
        }
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_store_list() {
    let cli = Cli::try_parse_from(vec!["precache", "store", "list"]).unwrap();
    match cli.command {
        Commands::Store(args) => assert!(matches!(args.command, StoreCommands::List)),
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_unknown_command_rejected() {
    assert!(Cli::try_parse_from(vec!["precache", "purge"]).is_err());
}
