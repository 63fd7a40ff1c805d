//! `parrotkv-inspect`: a read-only inspector over a database file. Output is
//! meant for humans debugging a file, not for scripts to parse.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use parrotkv::btree;
use parrotkv::page::{self, PageId};
use parrotkv::pager::{Pager, PagerOptions};
use parrotkv::Result;

#[derive(Parser)]
#[command(name = "parrotkv-inspect", about = "Inspect a parrotkv database file")]
struct Args {
    /// Path to the database file.
    #[arg(long)]
    db: PathBuf,

    /// Show a database-wide summary (default action).
    #[arg(long, group = "action")]
    summary: bool,

    /// Show the contents of a single page.
    #[arg(long, group = "action", value_name = "ID")]
    page: Option<PageId>,

    /// Show the B+ tree layout.
    #[arg(long, group = "action")]
    tree: bool,

    /// Show the freelist.
    #[arg(long, group = "action")]
    freelist: bool,
}

fn print_section(title: &str) {
    println!();
    println!("=== {title} ===");
}

fn print_field(name: &str, value: impl std::fmt::Display) {
    println!("  {name}: {value}");
}

fn key_repr(key: &[u8], max_len: usize) -> String {
    match std::str::from_utf8(key) {
        Ok(text) if text.len() <= max_len => format!("{text:?}"),
        Ok(text) => format!("{:?}...", &text[..max_len]),
        Err(_) => {
            let hex: String = key.iter().take(max_len).map(|b| format!("{b:02x}")).collect();
            if key.len() > max_len {
                format!("0x{hex}...")
            } else {
                format!("0x{hex}")
            }
        }
    }
}

fn cmd_summary(pager: &mut Pager) -> Result<()> {
    print_section("Header");
    let header = pager.read_header()?;
    print_field("version", header.version);
    print_field("page_size", header.page_size);

    print_section("Meta pages");
    let active = pager.read_active_meta()?;
    for id in [page::META_PAGE_A_ID, page::META_PAGE_B_ID] {
        match pager.read_meta(id) {
            Ok(meta) => {
                let status = if meta.page_id == active.page_id {
                    "ACTIVE"
                } else {
                    "inactive"
                };
                println!("  Meta {id} ({status}):");
                print_field("    txn_id", meta.txn_id);
                print_field("    root_page_id", meta.root_page_id);
                print_field("    freelist_page_id", meta.freelist_page_id);
            }
            Err(e) => println!("  Meta {id}: INVALID ({e})"),
        }
    }

    print_section("File statistics");
    print_field("total_pages", pager.page_count());
    print_field(
        "data_pages",
        pager.page_count().saturating_sub(page::FIRST_DATA_PAGE_ID),
    );
    print_field("free_pages", pager.freelist().count());
    print_field(
        "file_size_bytes",
        pager.page_count() as u64 * pager.page_size() as u64,
    );

    if active.root_page_id != 0 {
        print_section("B+ tree");
        print_field("root_page", active.root_page_id);
        print_field("height", btree::tree_height(pager, active.root_page_id)?);
        print_field("total_keys", btree::count_keys(pager, active.root_page_id)?);
    }
    println!();
    Ok(())
}

fn cmd_page(pager: &mut Pager, page_id: PageId) -> Result<()> {
    if page_id == page::HEADER_PAGE_ID {
        print_section("Header (page 0)");
        let header = pager.read_header()?;
        print_field("version", header.version);
        print_field("page_size", header.page_size);
        println!();
        return Ok(());
    }
    if page_id == page::META_PAGE_A_ID || page_id == page::META_PAGE_B_ID {
        let meta = pager.read_meta(page_id)?;
        print_section(&format!("Meta page {page_id}"));
        print_field("txn_id", meta.txn_id);
        print_field("root_page_id", meta.root_page_id);
        print_field("freelist_page_id", meta.freelist_page_id);
        println!();
        return Ok(());
    }

    let raw = pager.read_raw(page_id)?;
    let kind = raw.first().and_then(|&b| page::PageKind::from_byte(b));
    print_section(&format!("Page {page_id}"));
    match kind {
        Some(page::PageKind::Freelist) => {
            let fl = pager.read_freelist(page_id)?;
            print_field("type", "freelist");
            print_field("free_page_count", fl.free_page_ids.len());
            let shown: Vec<_> = fl.free_page_ids.iter().take(20).collect();
            println!("  free_pages: {shown:?}{}", if fl.free_page_ids.len() > 20 { "..." } else { "" });
        }
        Some(page::PageKind::Leaf) => {
            let leaf = pager.read_leaf(page_id)?;
            print_field("type", "leaf");
            print_field("cell_count", leaf.cells.len());
            print_field("right_sibling", leaf.right_sibling);
            for (i, (k, v)) in leaf.cells.iter().take(10).enumerate() {
                println!("    [{i}] key={} value={}", key_repr(k, 20), key_repr(v, 20));
            }
            if leaf.cells.len() > 10 {
                println!("    ... and {} more cells", leaf.cells.len() - 10);
            }
        }
        Some(page::PageKind::Branch) => {
            let branch = pager.read_branch(page_id)?;
            print_field("type", "branch");
            print_field("key_count", branch.keys.len());
            println!("  children: {:?}", branch.children);
            for (i, k) in branch.keys.iter().take(10).enumerate() {
                println!("    [{i}] separator={}", key_repr(k, 20));
            }
            if branch.keys.len() > 10 {
                println!("    ... and {} more keys", branch.keys.len() - 10);
            }
        }
        _ => println!("  (unknown page type)"),
    }
    println!();
    Ok(())
}

fn cmd_freelist(pager: &mut Pager) -> Result<()> {
    print_section("Freelist");
    let active = pager.read_active_meta()?;
    if active.freelist_page_id == 0 {
        print_field("persisted_freelist_page", "none");
        print_field("in_memory_free_pages", pager.freelist().count());
        let pages = pager.freelist().to_sorted_list();
        let shown: Vec<_> = pages.iter().take(20).collect();
        println!("  free_page_ids: {shown:?}{}", if pages.len() > 20 { "..." } else { "" });
    } else {
        let page = pager.read_freelist(active.freelist_page_id)?;
        print_field("freelist_page_id", active.freelist_page_id);
        print_field("free_page_count", page.free_page_ids.len());
        let shown: Vec<_> = page.free_page_ids.iter().take(20).collect();
        println!("  free_page_ids: {shown:?}{}", if page.free_page_ids.len() > 20 { "..." } else { "" });
    }
    println!();
    Ok(())
}

fn cmd_tree(pager: &mut Pager) -> Result<()> {
    print_section("B+ tree structure");
    let active = pager.read_active_meta()?;
    if active.root_page_id == 0 {
        println!("  tree is empty (no root page)");
        println!();
        return Ok(());
    }
    print_field("root_page", active.root_page_id);
    print_field("height", btree::tree_height(pager, active.root_page_id)?);
    print_field("total_keys", btree::count_keys(pager, active.root_page_id)?);
    println!();
    println!("  layout:");
    print_tree_node(pager, active.root_page_id, 0)?;
    println!();
    Ok(())
}

fn print_tree_node(pager: &mut Pager, page_id: PageId, depth: usize) -> Result<()> {
    let indent = "    ".to_string() + &"  ".repeat(depth);
    let raw = pager.read_raw(page_id)?;
    match raw.first().and_then(|&b| page::PageKind::from_byte(b)) {
        Some(page::PageKind::Leaf) => {
            let leaf = pager.read_leaf(page_id)?;
            println!("{indent}[Leaf {page_id}] {} cells", leaf.cells.len());
            if let (Some(first), Some(last)) = (leaf.cells.first(), leaf.cells.last()) {
                if depth < 3 {
                    println!(
                        "{indent}  keys: {} .. {}",
                        key_repr(&first.0, 20),
                        key_repr(&last.0, 20)
                    );
                }
            }
        }
        Some(page::PageKind::Branch) => {
            let branch = pager.read_branch(page_id)?;
            println!(
                "{indent}[Branch {page_id}] {} keys, {} children",
                branch.keys.len(),
                branch.children.len()
            );
            if depth < 3 {
                if let (Some(first), Some(last)) = (branch.keys.first(), branch.keys.last()) {
                    println!(
                        "{indent}  separators: {} .. {}",
                        key_repr(first, 20),
                        key_repr(last, 20)
                    );
                }
            }
            if depth < 2 {
                let children = branch.children.clone();
                for child in children {
                    print_tree_node(pager, child, depth + 1)?;
                }
            } else {
                println!("{indent}  ({} children not expanded)", branch.children.len());
            }
        }
        _ => println!("{indent}[unknown page {page_id}]"),
    }
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let mut pager = Pager::open(
        &args.db,
        PagerOptions {
            create_if_missing: false,
            ..PagerOptions::default()
        },
    )?;

    if let Some(page_id) = args.page {
        cmd_page(&mut pager, page_id)
    } else if args.tree {
        cmd_tree(&mut pager)
    } else if args.freelist {
        cmd_freelist(&mut pager)
    } else {
        cmd_summary(&mut pager)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
