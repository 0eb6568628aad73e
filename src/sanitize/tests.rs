use super::Sanitizer;
use crate::config::ExtractionConfig;
use crate::text;

fn sanitizer() -> Sanitizer {
    Sanitizer::new(&ExtractionConfig::default()).unwrap()
}

const LOREM: &str = "Nous recherchons un développeur confirmé pour rejoindre notre équipe \
                     technique et participer à la conception de nos produits.";

fn samples() -> Vec<String> {
    vec![
        String::new(),
        "plain text only".to_string(),
        "<p>Hello</p>".to_string(),
        format!(
            r#"<header>Site</header><nav><a href="/">Home</a></nav>
               <div class="wrapper"><div class="inner"><div id="main">
                 <h2 class="title">Poste</h2><p style="x">{LOREM}</p>
                 <ul><li>Java</li><li> </li><li>SQL</li></ul>
               </div></div></div>
               <div class="pagination"><a href="?p=2">2</a></div>
               <footer>Footer</footer><script>track()</script>"#
        ),
        format!(r#"<div class="filters">{LOREM}{LOREM}</div><section><p>{LOREM}</p></section>"#),
        "<table><tr><td>Ville</td><td><b>Rabat</b></td></tr></table>".to_string(),
        "<h2><span><h3>Nested heading</h3></span></h2><p>after</p>".to_string(),
        "<div>Intro text<ul><li><div>Item <em>one</em></div></li></ul></div>".to_string(),
        r#"<p>Salary &lt; 10 000 &amp; more&nbsp;here <a href="/apply?a=1&amp;b=2" onclick="x()">apply</a></p>"#
            .to_string(),
        "<ul><li><p></p></li></ul><p><br></p><span>   </span>".to_string(),
        "<b><p>bold paragraph</p></b><i>x<p>y</p></i>".to_string(),
        "<h1><h2>Profil recherché</h2></h1><h3> </h3>".to_string(),
    ]
}

#[test]
fn test_clean_is_idempotent() {
    let sanitizer = sanitizer();
    for sample in samples() {
        let once = sanitizer.clean(&sample);
        let twice = sanitizer.clean(&once);
        assert_eq!(once, twice, "not idempotent for input: {sample}");
    }
}

#[test]
fn test_clean_strips_noise_and_attributes() {
    let sanitizer = sanitizer();
    let cleaned = sanitizer.clean(&samples()[3]);

    assert!(!cleaned.contains("Site"));
    assert!(!cleaned.contains("Footer"));
    assert!(!cleaned.contains("track()"));
    assert!(!cleaned.contains("?p=2"));
    assert!(!cleaned.contains("style"));
    assert!(!cleaned.contains("class"));
    assert!(cleaned.contains("<h2>Poste</h2>"));
    assert!(cleaned.contains("<ul><li>Java</li><li>SQL</li></ul>"));
}

#[test]
fn test_clean_picks_content_over_filter_block() {
    let sanitizer = sanitizer();
    let cleaned = sanitizer.clean(&samples()[4]);
    assert_eq!(cleaned, format!("<p>{LOREM}</p>"));
}

#[test]
fn test_short_fragment_is_kept_whole() {
    let sanitizer = sanitizer();
    let cleaned = sanitizer.clean("<div><p>Short</p></div><div><p>Also short</p></div>");
    assert_eq!(cleaned, "<p>Short</p><p>Also short</p>");
}

#[test]
fn test_only_href_survives_on_links() {
    let sanitizer = sanitizer();
    let cleaned = sanitizer.clean(&samples()[8]);
    assert!(cleaned.contains(r#"<a href="/apply?a=1&amp;b=2">apply</a>"#));
    assert!(!cleaned.contains("onclick"));
    assert!(cleaned.contains("&lt; 10 000"));
}

#[test]
fn test_text_projection_of_cleaned_html() {
    let sanitizer = sanitizer();
    let cleaned = sanitizer.clean("<div><p>Poste :</p><p>Développeur   <b>Rust</b></p></div>");
    assert_eq!(text::html_to_text(&cleaned), "Poste : Développeur Rust");
}

#[test]
fn test_empty_headings_are_dropped() {
    let sanitizer = sanitizer();
    assert_eq!(sanitizer.clean(&samples()[11]), "<h2>Profil recherché</h2>");
}
