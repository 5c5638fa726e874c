//! Generation tests against fixture lockfiles
//!
//! These run the full lockfile -> resolve -> aggregate -> script pipeline with
//! an in-memory resolver, so no network access is needed.

use lockdock::generate::{default_repository, generate, parse_repository, GenerateOptions};
use lockdock::sysreqs::{ResolveError, ResolveOptions, StaticResolver};
use lockdock::{AggregationMode, Distro, GenerateError, Instruction, Lockfile};
use std::path::PathBuf;
use std::time::Duration;

fn fixture(name: &str) -> Lockfile {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/lockfiles")
        .join(name)
        .join("renv.lock");
    Lockfile::from_path(&path).expect("Failed to load fixture lockfile")
}

fn ubuntu_resolver() -> StaticResolver {
    StaticResolver::new()
        .with_requirements("curl", &["apt-get install -y libcurl4-openssl-dev"])
        .with_requirements("xml2", &["apt-get install -y libxml2-dev"])
}

fn run_lines(script: &str) -> Vec<String> {
    script
        .lines()
        .filter(|l| l.starts_with("RUN "))
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_fixture_lockfile_loads_in_order() {
    let lockfile = fixture("basic");

    assert_eq!(lockfile.runtime_version(), "4.1.2");
    assert_eq!(
        lockfile.package_names(),
        vec!["curl", "jsonlite", "renv", "xml2"]
    );
    assert_eq!(lockfile.repositories().len(), 1);
    assert_eq!(
        lockfile.package("xml2").and_then(|p| p.hash.as_deref()),
        Some("40682ed6a969ea5abfd351eb67833adc")
    );
}

#[tokio::test]
async fn test_compact_generation() {
    let resolver = ubuntu_resolver();
    let generation = generate(&fixture("basic"), &GenerateOptions::default(), &resolver)
        .await
        .unwrap();

    let script = generation.script.render();
    assert!(script.starts_with("FROM rocker/r-base:4.1.2\n"));
    assert_eq!(
        run_lines(&script)[0],
        "RUN apt-get update -y && apt-get install -y libcurl4-openssl-dev libxml2-dev \
         && rm -rf /var/lib/apt/lists/*"
    );
    assert!(script.contains(r#"remotes::install_version("renv", version = "0.15.4")"#));
    assert!(script.ends_with("COPY renv.lock renv.lock\nRUN R -e 'renv::restore()'\n"));

    // One lookup per locked package, including ones without requirements
    assert_eq!(resolver.calls(), 4);
}

#[tokio::test]
async fn test_expand_generation() {
    let options = GenerateOptions {
        mode: AggregationMode::Expand,
        ..Default::default()
    };
    let generation = generate(&fixture("basic"), &options, &ubuntu_resolver())
        .await
        .unwrap();

    let runs = run_lines(&generation.script.render());
    assert_eq!(
        &runs[..4],
        &[
            "RUN apt-get update -y",
            "RUN apt-get install -y libcurl4-openssl-dev",
            "RUN apt-get install -y libxml2-dev",
            "RUN rm -rf /var/lib/apt/lists/*",
        ]
    );
    assert_eq!(
        generation.plan.map(|p| p.mode),
        Some(AggregationMode::Expand)
    );
}

#[tokio::test]
async fn test_shared_requirements_are_installed_once() {
    let resolver = StaticResolver::new()
        .with_requirements("curl", &["apt-get install -y libcurl4-openssl-dev libssl-dev"])
        .with_requirements("xml2", &["apt-get install -y libssl-dev libxml2-dev"]);

    let generation = generate(&fixture("basic"), &GenerateOptions::default(), &resolver)
        .await
        .unwrap();

    let plan = generation.plan.unwrap();
    assert_eq!(
        plan.install_commands(),
        &["apt-get install -y libcurl4-openssl-dev libssl-dev libxml2-dev".to_string()]
    );
}

#[tokio::test]
async fn test_centos_uses_yum_templates() {
    let resolver = StaticResolver::new().with_requirements("xml2", &["yum install -y libxml2-devel"]);
    let options = GenerateOptions::for_distro("centos7").unwrap();

    let generation = generate(&fixture("basic"), &options, &resolver)
        .await
        .unwrap();

    assert_eq!(
        run_lines(&generation.script.render())[0],
        "RUN yum update -y && yum install -y libxml2-devel && yum clean all && rm -rf /var/cache/yum"
    );
}

#[tokio::test]
async fn test_extra_sysreqs_without_resolution() {
    let resolver = ubuntu_resolver();
    let options = GenerateOptions {
        sysreqs: false,
        extra_sysreqs: vec!["git".to_string(), "make".to_string()],
        ..Default::default()
    };

    let generation = generate(&fixture("basic"), &options, &resolver)
        .await
        .unwrap();

    assert_eq!(resolver.calls(), 0);
    assert_eq!(
        run_lines(&generation.script.render())[0],
        "RUN apt-get update -y && apt-get install -y git make && rm -rf /var/lib/apt/lists/*"
    );
}

#[tokio::test]
async fn test_no_requirements_omits_os_step() {
    let generation = generate(
        &fixture("unpinned"),
        &GenerateOptions::default(),
        &StaticResolver::new(),
    )
    .await
    .unwrap();

    let script = generation.script.render();
    assert!(!script.contains("apt-get"));
    assert!(generation.plan.is_some_and(|p| !p.has_install_step()));
    assert!(script.contains(r#"RUN R -e 'install.packages("renv")'"#));
    assert!(script.starts_with("FROM rocker/r-base:4.0.5\n"));
}

#[tokio::test]
async fn test_failed_lookups_degrade_to_partial_output() {
    let resolver = ubuntu_resolver()
        .with_error(
            "curl",
            ResolveError::Status {
                status: 503,
                body: "unavailable".to_string(),
            },
        )
        .with_delay("jsonlite", Duration::from_millis(500));
    let options = GenerateOptions {
        resolve: ResolveOptions {
            concurrency: 2,
            timeout: Duration::from_millis(50),
        },
        ..Default::default()
    };

    let generation = generate(&fixture("basic"), &options, &resolver)
        .await
        .unwrap();

    let failed: Vec<_> = generation
        .failures
        .iter()
        .map(|f| f.package.as_str())
        .collect();
    assert_eq!(failed, vec!["curl", "jsonlite"]);

    assert_eq!(
        run_lines(&generation.script.render())[0],
        "RUN apt-get update -y && apt-get install -y libxml2-dev && rm -rf /var/lib/apt/lists/*"
    );
}

#[tokio::test]
async fn test_invalid_distro_fails_before_any_lookup() {
    let resolver = ubuntu_resolver();

    let result = GenerateOptions::for_distro("jammy");
    assert!(matches!(result, Err(GenerateError::Distro(_))));
    assert_eq!(resolver.calls(), 0);
}

#[tokio::test]
async fn test_invalid_options_fail_before_any_lookup() {
    let resolver = ubuntu_resolver();
    let options = GenerateOptions {
        repos: Vec::new(),
        ..Default::default()
    };

    let result = generate(&fixture("basic"), &options, &resolver).await;
    assert!(matches!(result, Err(GenerateError::InvalidOptions(_))));
    assert_eq!(resolver.calls(), 0);
}

#[tokio::test]
async fn test_custom_image_alias_repos_and_pak() {
    let options = GenerateOptions {
        distro: Distro::Bionic,
        from: "rocker/r-ver".to_string(),
        alias: Some("deps".to_string()),
        repos: vec![
            default_repository(),
            parse_repository("BIOC=https://bioconductor.org/packages/3.14/bioc").unwrap(),
        ],
        renv_version: Some("0.16.0".to_string()),
        use_pak: true,
        lockfile_name: "project.lock".to_string(),
        ..Default::default()
    };

    let generation = generate(&fixture("basic"), &options, &ubuntu_resolver())
        .await
        .unwrap();

    assert_eq!(
        generation.script.instructions()[0],
        Instruction::From {
            image: "rocker/r-ver:4.1.2".to_string(),
            alias: Some("deps".to_string()),
        }
    );

    let script = generation.script.render();
    assert!(script.contains(
        "repos = c(CRAN = 'https://cran.rstudio.com/', BIOC = 'https://bioconductor.org/packages/3.14/bioc')"
    ));
    assert!(script.contains("renv.config.pak.enabled = TRUE"));
    assert!(script.contains(r#"RUN R -e 'install.packages("pak")'"#));
    assert!(script.contains(r#"remotes::install_version("renv", version = "0.16.0")"#));
    assert!(script.contains("COPY project.lock renv.lock\n"));
}

#[test]
fn test_missing_runtime_version_is_rejected() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/lockfiles/missing-version/renv.lock");
    assert!(Lockfile::from_path(&path).is_err());
}
