//! Dispatches one command line against a mounted [`furgfs::Volume`], the
//! same shape as `fdisk`'s `handle_cmd`: match on the command word, print
//! results or `furgfs: error: ...` on failure, never touch the backing file
//! directly.

use furgfs::{EntryType, Volume};

/// Splits `line` into a command word and the rest, on whitespace.
fn split(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (line, ""),
    }
}

fn print_help() {
    println!();
    println!("Commands:");
    println!("  ls [-r]              list the current directory (-r: recursive sizes)");
    println!("  cd <name|..>          change directory");
    println!("  mkdir <name>          create a subdirectory");
    println!("  rmdir <name>          remove an empty subdirectory");
    println!("  put <host-path> [name]  import a host file");
    println!("  get <name> <host-path>  export a file to the host");
    println!("  rm <name>             remove a file");
    println!("  rename <old> <new>    rename a file or directory");
    println!("  protect <name>        toggle the protected flag");
    println!("  verify <name>         print a file's MD5 digest and size");
    println!("  df                    print free/total space");
    println!("  pwd                   print the current path");
    println!("  help                  print this message");
    println!("  quit                  unmount and exit");
    println!();
}

fn report<T>(result: furgfs::Result<T>) {
    if let Err(e) = result {
        eprintln!("furgfs: error: {e}");
    }
}

/// Looks up `name`'s entry type among the current directory's listing, so
/// `rename` can dispatch to `rename_file`/`rename_directory` without the CLI
/// maintaining its own copy of directory state.
fn entry_type(volume: &mut Volume, name: &str) -> furgfs::Result<Option<EntryType>> {
    Ok(volume
        .list(false)?
        .into_iter()
        .find(|listed| listed.entry.name == name)
        .map(|listed| listed.entry.entry_type))
}

/// Handles one command line. Returns `false` when the prompt loop should
/// stop (`quit`/`exit` or end of input).
pub fn handle_line(volume: &mut Volume, line: &str) -> bool {
    let (cmd, rest) = split(line);
    match cmd {
        "ls" => match volume.list(rest.trim() == "-r") {
            Ok(entries) => {
                for listed in entries {
                    let kind = match listed.entry.entry_type {
                        EntryType::Directory => "d",
                        EntryType::File => "-",
                    };
                    let size = listed.calculated_size.unwrap_or(listed.entry.size as u64);
                    let prot = if listed.entry.protected { "p" } else { " " };
                    println!("{kind}{prot} {size:>10}  {}", listed.entry.name);
                }
            }
            Err(e) => eprintln!("furgfs: error: {e}"),
        },

        "cd" => {
            if rest.is_empty() {
                eprintln!("furgfs: cd: missing directory name");
            } else {
                report(volume.change_directory(rest));
            }
        }

        "mkdir" => {
            if rest.is_empty() {
                eprintln!("furgfs: mkdir: missing name");
            } else {
                report(volume.create_directory(rest));
            }
        }

        "rmdir" => {
            if rest.is_empty() {
                eprintln!("furgfs: rmdir: missing name");
            } else {
                report(volume.remove_directory(rest));
            }
        }

        "put" => {
            let mut parts = rest.splitn(2, char::is_whitespace);
            let Some(host_path) = parts.next().filter(|s| !s.is_empty()) else {
                eprintln!("furgfs: put: missing host path");
                return true;
            };
            let dest_name = parts.next().map(str::trim).filter(|s| !s.is_empty());
            report(volume.copy_in(host_path, dest_name));
        }

        "get" => {
            let mut parts = rest.splitn(2, char::is_whitespace);
            let name = parts.next().filter(|s| !s.is_empty());
            let host_path = parts.next().map(str::trim).filter(|s| !s.is_empty());
            match (name, host_path) {
                (Some(name), Some(host_path)) => report(volume.copy_out(name, host_path)),
                _ => eprintln!("furgfs: get: usage: get <name> <host-path>"),
            }
        }

        "rm" => {
            if rest.is_empty() {
                eprintln!("furgfs: rm: missing name");
            } else {
                report(volume.remove_file(rest));
            }
        }

        "rename" => {
            let mut parts = rest.splitn(2, char::is_whitespace);
            let old = parts.next().filter(|s| !s.is_empty());
            let new = parts.next().map(str::trim).filter(|s| !s.is_empty());
            match (old, new) {
                (Some(old), Some(new)) => match entry_type(volume, old) {
                    Ok(Some(EntryType::File)) => report(volume.rename_file(old, new)),
                    Ok(Some(EntryType::Directory)) => report(volume.rename_directory(old, new)),
                    Ok(None) => eprintln!("furgfs: error: {old}: not found"),
                    Err(e) => eprintln!("furgfs: error: {e}"),
                },
                _ => eprintln!("furgfs: rename: usage: rename <old> <new>"),
            }
        }

        "protect" => {
            if rest.is_empty() {
                eprintln!("furgfs: protect: missing name");
            } else {
                report(volume.toggle_protection(rest));
            }
        }

        "verify" => {
            if rest.is_empty() {
                eprintln!("furgfs: verify: missing name");
            } else {
                match volume.verify_integrity(rest) {
                    Ok((digest, size)) => println!("{rest}: {digest}  ({size} bytes)"),
                    Err(e) => eprintln!("furgfs: error: {e}"),
                }
            }
        }

        "df" => {
            let (free, total) = volume.space_info();
            println!(
                "{} free of {} ({})",
                furgfs::util::ByteSize(free),
                furgfs::util::ByteSize(total),
                volume.current_path()
            );
        }

        "pwd" => println!("{}", volume.current_path()),

        "help" | "?" => print_help(),

        "quit" | "exit" => return false,

        _ => eprintln!("furgfs: {cmd}: unknown command (try `help`)"),
    }
    true
}
