use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "templ",
    about = "Fetch template collections from git and render them",
    long_about = "Render templates from the local template store.\n\n\
        Each TEMPLATE is a template name, or name=variables.yaml to fill the \
        template's variables from a YAML file of `name: value` pairs. Without a \
        variables file the template is printed as it is.\n\n\
        When input is piped in, it is used as the template and the arguments are \
        NAME=VALUE assignments: `templ deploy.yaml | templ NAME=web`.\n\n\
        Collections are fetched with `templ -f <git url or directory>` and kept \
        current with `templ -u`.",
    version
)]
pub struct Cli {
    /// Templates to render: NAME or NAME=VARIABLES_FILE
    #[arg(value_name = "TEMPLATE")]
    pub templates: Vec<String>,

    /// List available templates
    #[arg(short, long)]
    pub list: bool,

    /// Update every fetched template collection
    #[arg(short, long)]
    pub update: bool,

    /// Fetch a template collection from a git URL or a local directory
    #[arg(short, long, value_name = "ORIGIN")]
    pub fetch: Option<String>,

    /// Only show the variables the templates use
    #[arg(short, long)]
    pub variables: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}
