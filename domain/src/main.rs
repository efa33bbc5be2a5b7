use std::env;
use std::process;

use domain::adapters::memory_repo::InMemoryUserStore;
use domain::service::UserDirectory;
use domain::{CoreError, NewUser, User};

fn print_usage() {
    eprintln!(
        "{}\n\nUsage:\n  domain create <name> <email> [<name> <email> ...] [--search <query>]\n  domain get <id>\n\nNotes:\n  - This demo CLI uses an in-memory store; data is not persisted across runs.\n  - `create` registers every pair in order, then lists (or searches) the result.",
        domain::about()
    );
}

fn print_user(user: &User) {
    println!("{}  {} <{}>", user.id, user.name.as_str(), user.email.as_str());
}

/// Parsed arguments of the `create` command.
#[derive(Debug, PartialEq, Eq)]
struct CreateArgs {
    pairs: Vec<(String, String)>,
    query: Option<String>,
}

fn parse_create_args(rest: &[String]) -> Result<CreateArgs, String> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut query: Option<String> = None;
    let mut i = 0;
    while i < rest.len() {
        match rest[i].as_str() {
            "--search" => {
                if i + 1 >= rest.len() {
                    return Err("--search requires a query".into());
                }
                query = Some(rest[i + 1].clone());
                i += 2;
            }
            unk if unk.starts_with("--") => {
                return Err(format!("unknown argument: {}", unk));
            }
            name => {
                if i + 1 >= rest.len() {
                    return Err(format!("missing <email> for '{}'", name));
                }
                pairs.push((name.to_string(), rest[i + 1].clone()));
                i += 2;
            }
        }
    }
    if pairs.is_empty() {
        return Err("missing <name> <email> for create".into());
    }
    Ok(CreateArgs { pairs, query })
}

fn run() -> Result<(), String> {
    let mut args = env::args().skip(1); // skip program name

    let Some(cmd) = args.next() else {
        print_usage();
        return Ok(());
    };

    let directory = UserDirectory::new(InMemoryUserStore::new());

    match cmd.as_str() {
        "create" => {
            let rest: Vec<String> = args.collect();
            let CreateArgs { pairs, query } = parse_create_args(&rest)?;

            for (name, email) in pairs {
                let candidate = NewUser::new(name, email).map_err(|e| e.to_string())?;
                match directory.create_user(candidate) {
                    Ok(user) => {
                        print!("created: ");
                        print_user(&user);
                    }
                    Err(CoreError::EmailConflict(email)) => {
                        eprintln!("skipped: email already registered: {}", email);
                    }
                    Err(e) => return Err(format!("create failed: {}", e)),
                }
            }

            let users = directory
                .search_users(query.as_deref())
                .map_err(|e| format!("search failed: {}", e))?;
            println!("-- {} user(s)", users.len());
            for user in &users {
                print_user(user);
            }
            Ok(())
        }
        "get" => {
            let Some(raw) = args.next() else {
                return Err("missing <id> for get".into());
            };
            let id = domain::UserId::parse(&raw).map_err(|e| e.to_string())?;
            match directory.get_user_by_id(&id) {
                Ok(user) => {
                    print_user(&user);
                    Ok(())
                }
                Err(CoreError::NotFound(_)) => Err("not found".into()),
                Err(e) => Err(format!("get failed: {}", e)),
            }
        }
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn main() {
    if let Err(msg) = run() {
        eprintln!("error: {}", msg);
        process::exit(1);
    }
}
