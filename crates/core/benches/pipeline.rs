use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sitesift_core::{CleanConfig, CrawlConfig, FetchedDocument, SiteCollector, clean_html, score};

fn synthetic_page(index: usize, paragraphs: usize) -> String {
    let mut main = String::new();
    for p in 0..paragraphs {
        main.push_str(&format!(
            "<div class=\"wrapper\"><span><p>Paragraph {} of page {} has a few sentences of ordinary prose. \
             It mentions <a href=\"/topic/{}\">a topic</a> and <em>emphasis</em>.</p></span></div>",
            p, index, p
        ));
    }
    format!(
        "<html><head><title>Page {} | Synthetic</title></head><body>\
         <header><nav><a href=\"/\">Home</a></nav></header>\
         <main><h1>Heading {}</h1><div class=\"banner\">Site wide announcement banner text</div>{}</main>\
         <footer>Footer</footer></body></html>",
        index, index, main
    )
}

fn bench_clean(c: &mut Criterion) {
    let mut group = c.benchmark_group("clean");
    let config = CleanConfig::default();

    for paragraphs in [10, 100] {
        let html = synthetic_page(0, paragraphs);
        group.bench_with_input(BenchmarkId::from_parameter(paragraphs), &html, |b, html| {
            b.iter(|| clean_html(black_box(html), &config))
        });
    }

    group.finish();
}

fn bench_score(c: &mut Criterion) {
    let html = synthetic_page(0, 100);
    c.bench_function("score", |b| b.iter(|| score(black_box(&html))));
}

fn bench_crawl(c: &mut Criterion) {
    let config = CrawlConfig::builder("https://example.com/").build().unwrap();
    let pages: Vec<FetchedDocument> = (0..50)
        .map(|i| FetchedDocument::html(format!("https://example.com/section{}/page{}", i % 5, i), synthetic_page(i, 20)))
        .collect();

    c.bench_function("crawl_50_pages", |b| {
        b.iter(|| {
            let mut collector = SiteCollector::new(&config).unwrap();
            for page in &pages {
                collector.ingest(page.clone());
            }
            collector.finish()
        })
    });
}

criterion_group!(benches, bench_clean, bench_score, bench_crawl);
criterion_main!(benches);
