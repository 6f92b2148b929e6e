use scraper::{ElementRef, Html, Selector};

#[track_caller]
pub(crate) fn must_get_form<'a>(html: &'a Html, action: &str) -> ElementRef<'a> {
    let selector = format!("form[action=\"{action}\"]");

    html.select(&Selector::parse(&selector).unwrap())
        .next()
        .unwrap_or_else(|| panic!("No form found posting to {action}"))
}

#[track_caller]
pub(crate) fn assert_form_action(form: &ElementRef<'_>, endpoint: &str) {
    let action = form
        .value()
        .attr("action")
        .unwrap_or_else(|| panic!("action attribute missing"));
    let method = form.value().attr("method").unwrap_or_default();

    assert_eq!(
        action, endpoint,
        "want form with attribute action=\"{endpoint}\", got {action:?}"
    );
    assert_eq!(method, "post", "want form to post, got method {method:?}");
}

#[track_caller]
pub(crate) fn assert_form_input(form: &ElementRef<'_>, name: &str, type_: &str) {
    for input in form.select(&Selector::parse("input").unwrap()) {
        let input_name = input.value().attr("name").unwrap_or_default();

        if input_name == name {
            let input_type = input.value().attr("type").unwrap_or_default();

            assert_eq!(
                input_type, type_,
                "want input with type \"{type_}\", got {input_type:?}"
            );

            return;
        }
    }

    panic!("No input found with name \"{name}\" and type \"{type_}\"");
}
