use crate::html::escape_html;

pub(crate) const QUESTION_PLACEHOLDER: &str = "Ask a question to see its Cypher query.";
pub(crate) const EMPTY_OUTPUT: &str = "(no output)";
pub(crate) const TRUNCATED_NOTICE: &str = "[output truncated]";

/// What the results page shows in its output heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OutputView {
    Query { text: String, truncated: bool },
    Placeholder,
    Message(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResultsView {
    pub(crate) question: Option<String>,
    pub(crate) output: OutputView,
}

fn layout(title: &str, main: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
    <head>
        <title>NL2CQ - {title}</title>
        <meta charset="utf-8">
        <link rel="stylesheet" type="text/css" href="/css/style.css">
    </head>
    <body>
        <header>
            <a id="nl2cqHead" href="/">NL2CQ</a>
        </header>
        <img class="mainLogo" src="/res/logo.svg" alt="NL2CQ Logo">
        <main>
{main}
        </main>
        <footer>
            <span>The Phonetics</span>
            <nav>
                <a href="/about">About</a>
                <em> | </em>
                <a href="/documentation">Documentation</a>
            </nav>
        </footer>
    </body>
</html>
"#,
        title = escape_html(title),
    )
}

pub(crate) fn home_page() -> String {
    layout(
        "Home",
        r#"            <form action="/results" method="get">
                <fieldset>
                    <label for="userInput">Ask a question:</label>
                    <input id="userInput" type="text" name="question" autofocus>
                    <input type="submit" class="largeButton" value="SUBMIT">
                </fieldset>
            </form>"#,
    )
}

pub(crate) fn results_page(view: &ResultsView) -> String {
    let mut main = String::new();
    if let Some(question) = view.question.as_deref() {
        main.push_str(&format!(
            "            <p id=\"question\">{}</p>\n",
            escape_html(question)
        ));
    }
    main.push_str("            <h1 id=\"resultHeader\">The Cypher Query:</h1>\n");
    let output = match &view.output {
        OutputView::Query { text, truncated } => {
            let mut body = if text.trim().is_empty() {
                EMPTY_OUTPUT.to_string()
            } else {
                escape_html(text.trim_end())
            };
            if *truncated {
                body.push('\n');
                body.push_str(TRUNCATED_NOTICE);
            }
            format!("<h2 id=\"output\">{body}</h2>")
        }
        OutputView::Placeholder => {
            format!("<h2 id=\"output\" class=\"placeholder\">{QUESTION_PLACEHOLDER}</h2>")
        }
        OutputView::Message(message) => {
            format!(
                "<h2 id=\"output\" class=\"error\">{}</h2>",
                escape_html(message)
            )
        }
    };
    main.push_str("            ");
    main.push_str(&output);
    main.push('\n');
    main.push_str("            <a href=\"/\" class=\"largeButton\">Ask another Question</a>");
    layout("Results", &main)
}

pub(crate) fn about_page() -> String {
    layout(
        "About",
        r#"            <h1>About NL2CQ</h1>
            <p>NL2CQ turns plain English questions about a graph database into
            Cypher queries. Type a question such as
            <em>Show me the names of actors in the movie with title Cloud Atlas</em>
            and the translator answers with the matching query.</p>
            <p>Built by The Phonetics.</p>"#,
    )
}

pub(crate) fn documentation_page() -> String {
    layout(
        "Documentation",
        r#"            <h1>Documentation</h1>
            <p>Questions are sent to the translator exactly as typed, as a
            single argument. The translator removes stop words, tags the
            remaining words and matches them against the labels, relationships
            and properties of the graph.</p>
            <ul>
                <li>Name a label: <em>Show me all movies</em></li>
                <li>Filter on a property: <em>Who acted in the movie with title Cloud Atlas</em></li>
                <li>Follow a relationship: <em>Show me the title of all the movies that Halle Berry acted in</em></li>
            </ul>
            <p>Long running translations are stopped after a fixed time and
            reported as a failure.</p>"#,
    )
}

pub(crate) fn not_found_page() -> String {
    layout(
        "Not Found",
        r#"            <h1>Page not found</h1>
            <a href="/" class="largeButton">Back to the question form</a>"#,
    )
}
