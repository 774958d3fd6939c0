//! Example: Fetch a few pages and compare raw and pruned markdown
//!
//! Run with: cargo run -p sitecrawl --example fetch_pages

use sitecrawl::{fetch_page, markdown_filename, CrawlResult, MarkdownVariant};

/// Test case definition
struct TestCase {
    url: &'static str,
    description: &'static str,
    expect_markdown: bool,
    expect_contains: Option<&'static str>,
}

const TEST_CASES: &[TestCase] = &[
    TestCase {
        url: "https://example.com",
        description: "Simple HTML page",
        expect_markdown: true,
        expect_contains: Some("Example Domain"),
    },
    TestCase {
        url: "https://httpbin.org/html",
        description: "HTML endpoint",
        expect_markdown: true,
        expect_contains: Some("Herman Melville"),
    },
    TestCase {
        url: "https://raw.githubusercontent.com/rust-lang/rust/master/README.md",
        description: "Raw markdown file",
        expect_markdown: true,
        expect_contains: Some("Rust"),
    },
    TestCase {
        url: "https://httpbin.org/json",
        description: "JSON endpoint (no markdown)",
        expect_markdown: false,
        expect_contains: None,
    },
    TestCase {
        url: "https://httpbin.org/status/404",
        description: "Missing page",
        expect_markdown: false,
        expect_contains: None,
    },
];

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    println!("Sitecrawl page examples");
    println!("=======================\n");

    let mut passed = 0;
    let mut failed = 0;

    for (i, case) in TEST_CASES.iter().enumerate() {
        println!("{}. {}", i + 1, case.description);
        println!("   URL: {}", case.url);
        println!("   File: {}", markdown_filename(case.url));

        match fetch_page(case.url).await {
            Ok(result) => {
                print_result_summary(&result);
                if check_expectations(case, &result) {
                    println!("   PASS\n");
                    passed += 1;
                } else {
                    println!("   FAIL (expectations not met)\n");
                    failed += 1;
                }
            }
            Err(e) => {
                println!("   Error: {}", e);
                println!("   FAIL\n");
                failed += 1;
            }
        }
    }

    println!("=======================");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed > 0 {
        std::process::exit(1);
    }
}

fn print_result_summary(result: &CrawlResult) {
    println!("   Status: {}", result.status_label());

    if let Some(ref ct) = result.content_type {
        println!("   Content-Type: {}", ct);
    }

    if let Some(ref markdown) = result.markdown {
        println!("   Raw: {} chars", markdown.raw_markdown.chars().count());
        if let Some(fit) = markdown.select(MarkdownVariant::Fit) {
            println!("   Fit: {} chars", fit.chars().count());
            let preview = fit.chars().take(100).collect::<String>().replace('\n', " ");
            println!("   Preview: {}", preview);
        }
    }

    if let Some(ref error) = result.error_message {
        println!("   Error: {}", error);
    }
}

fn check_expectations(case: &TestCase, result: &CrawlResult) -> bool {
    let raw = result.markdown.as_ref().map(|m| m.raw_markdown.as_str());

    if raw.is_some() != case.expect_markdown {
        println!(
            "   Expected markdown: {}, got: {}",
            case.expect_markdown,
            raw.is_some()
        );
        return false;
    }

    if let Some(expected_text) = case.expect_contains {
        if !raw.unwrap_or("").contains(expected_text) {
            println!("   Expected content to contain '{}'", expected_text);
            return false;
        }
    }

    true
}
