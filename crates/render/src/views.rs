/// Turns a template reference (and optional layout) into an HTML document.
///
/// The renderer never looks inside templates; whichever view machinery the
/// host application uses plugs in here. Consulted only for requests in HTML
/// mode that were not given HTML directly.
pub trait ViewRenderer {
    type Error: std::error::Error + Send + Sync + 'static;

    fn render_template(&self, template: &str, layout: Option<&str>) -> Result<String, exn::Exn<Self::Error>>;
}

impl<V: ViewRenderer + ?Sized> ViewRenderer for &V {
    type Error = V::Error;

    fn render_template(&self, template: &str, layout: Option<&str>) -> Result<String, exn::Exn<Self::Error>> {
        (**self).render_template(template, layout)
    }
}
