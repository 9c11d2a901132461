use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn cmd() -> assert_cmd::Command {
    assert_cmd::Command::from(Command::new(env!("CARGO_BIN_EXE_specgen")))
}

fn fixture_path(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

/// A scratch project with fixtures copied to the given relative paths.
fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (dest, fixture) in files {
        install(dir.path(), dest, fixture);
    }
    dir
}

fn install(root: &Path, dest: &str, fixture: &str) {
    let target = root.join(dest);
    fs::create_dir_all(target.parent().unwrap()).unwrap();
    fs::copy(fixture_path(fixture), target).unwrap();
}

fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).unwrap()
}

// -- new specs --

#[test]
fn creates_spec_for_simple_class() {
    let dir = project(&[("lib/foo.rb", "foo.rb")]);

    cmd()
        .current_dir(dir.path())
        .args(["-o", "spec", "lib/foo.rb"])
        .assert()
        .success()
        .stdout(predicate::str::contains("spec/foo_spec.rb created."));

    assert_eq!(
        read(dir.path(), "spec/foo_spec.rb"),
        "# frozen_string_literal: true

require 'spec_helper'
require 'foo'

RSpec.describe Foo do
  describe '#hello' do
    it 'works' do
      foo = described_class.new
      result = foo.hello

      expect(result).not_to be_nil
    end
  end
end
"
    );
}

#[test]
fn creates_spec_for_namespaced_class() {
    let dir = project(&[("lib/shapes/circle.rb", "circle.rb")]);

    cmd()
        .current_dir(dir.path())
        .args(["-o", "spec/", "./lib/shapes/circle.rb"])
        .assert()
        .success();

    let expected = fs::read_to_string(fixture_path("circle_spec.expected.rb")).unwrap();
    assert_eq!(read(dir.path(), "spec/shapes/circle_spec.rb"), expected);
}

#[test]
fn existing_spec_is_not_overwritten_without_force() {
    let dir = project(&[("lib/foo.rb", "foo.rb")]);
    fs::create_dir_all(dir.path().join("spec")).unwrap();
    fs::write(dir.path().join("spec/foo_spec.rb"), "# hand written\n").unwrap();

    cmd()
        .current_dir(dir.path())
        .args(["-o", "spec", "lib/foo.rb"])
        .assert()
        .success()
        .stdout(predicate::str::contains("spec/foo_spec.rb already exists."));

    assert_eq!(read(dir.path(), "spec/foo_spec.rb"), "# hand written\n");
}

// -- appending --

#[test]
fn force_appends_only_missing_examples() {
    let dir = project(&[("lib/foo.rb", "foo.rb")]);
    cmd()
        .current_dir(dir.path())
        .args(["-o", "spec", "lib/foo.rb"])
        .assert()
        .success();

    install(dir.path(), "lib/foo.rb", "foo_with_bye.rb");
    cmd()
        .current_dir(dir.path())
        .args(["-f", "-o", "spec", "lib/foo.rb"])
        .assert()
        .success()
        .stdout(predicate::str::contains("spec/foo_spec.rb modified."));

    assert_eq!(
        read(dir.path(), "spec/foo_spec.rb"),
        "# frozen_string_literal: true

require 'spec_helper'
require 'foo'

RSpec.describe Foo do
  describe '#hello' do
    it 'works' do
      foo = described_class.new
      result = foo.hello

      expect(result).not_to be_nil
    end
  end

  describe '#bye?' do
    it 'works' do
      foo = described_class.new
      result = foo.bye?

      expect(result).not_to be_nil
    end
  end
end
"
    );
}

#[test]
fn force_on_complete_spec_changes_nothing() {
    let dir = project(&[("lib/foo.rb", "foo_with_bye.rb")]);
    cmd()
        .current_dir(dir.path())
        .args(["-o", "spec", "lib/foo.rb"])
        .assert()
        .success();
    let before = read(dir.path(), "spec/foo_spec.rb");

    cmd()
        .current_dir(dir.path())
        .args(["-f", "-o", "spec", "lib/foo.rb"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    assert_eq!(read(dir.path(), "spec/foo_spec.rb"), before);
}

#[test]
fn force_keeps_hand_written_content() {
    let dir = project(&[("lib/foo.rb", "foo_with_bye.rb")]);
    fs::create_dir_all(dir.path().join("spec")).unwrap();
    let hand_written = "require 'foo'

RSpec.describe Foo do
  describe '#hello' do
    it { expect(described_class.new.hello).to eq('hello') }
  end
end # Foo

";
    fs::write(dir.path().join("spec/foo_spec.rb"), hand_written).unwrap();

    cmd()
        .current_dir(dir.path())
        .args(["--force", "--spec-dir", "spec", "lib/foo.rb"])
        .assert()
        .success();

    let merged = read(dir.path(), "spec/foo_spec.rb");
    assert!(merged.starts_with(
        "require 'foo'\n\nRSpec.describe Foo do\n  describe '#hello' do\n    it { expect(described_class.new.hello).to eq('hello') }\n  end\n\n  describe '#bye?' do\n"
    ));
    assert!(merged.ends_with("  end\nend\n"));
    assert!(!merged.contains("describe '#hello' do\n    it 'works'"));
}

#[test]
fn force_without_closing_end_aborts() {
    let dir = project(&[("lib/foo.rb", "foo.rb")]);
    fs::create_dir_all(dir.path().join("spec")).unwrap();
    fs::write(dir.path().join("spec/foo_spec.rb"), "# empty\n").unwrap();

    cmd()
        .current_dir(dir.path())
        .args(["-f", "-o", "spec", "lib/foo.rb"])
        .assert()
        .success()
        .stderr(predicate::str::contains("lib/foo.rb aborted - no closing `end` line"));

    assert_eq!(read(dir.path(), "spec/foo_spec.rb"), "# empty\n");
}

#[test]
fn excluded_spec_is_skipped() {
    let dir = project(&[("lib/foo.rb", "foo_with_bye.rb")]);
    fs::create_dir_all(dir.path().join("spec")).unwrap();
    let shared = "RSpec.describe Foo do\n  it_behaves_like 'a greeter'\nend\n";
    fs::write(dir.path().join("spec/foo_spec.rb"), shared).unwrap();

    cmd()
        .current_dir(dir.path())
        .args(["-f", "-x", r"it_behaves_like\s+'a greeter'", "-o", "spec", "lib/foo.rb"])
        .assert()
        .success()
        .stdout(predicate::str::contains("skipped (excluded)"));

    assert_eq!(read(dir.path(), "spec/foo_spec.rb"), shared);
}

// -- named scopes --

#[test]
fn scopes_get_examples_and_are_diffed() {
    let dir = project(&[("lib/foo_model.rb", "foo_model.rb")]);
    fs::create_dir_all(dir.path().join("spec")).unwrap();
    fs::write(
        dir.path().join("spec/foo_model_spec.rb"),
        "RSpec.describe FooModel do\n  describe '.active' do\n  end\nend\n",
    )
    .unwrap();

    cmd()
        .current_dir(dir.path())
        .args(["-f", "-o", "spec", "lib/foo_model.rb"])
        .assert()
        .success();

    let spec = read(dir.path(), "spec/foo_model_spec.rb");
    assert_eq!(spec.matches("'.active'").count(), 1);
    assert!(spec.contains("  describe '.recent' do\n"));
    assert!(spec.contains("result = described_class.recent\n"));
    assert!(spec.contains("  describe '#display_name' do\n"));
}

// -- dry run --

#[test]
fn dry_run_prints_and_writes_nothing() {
    let dir = project(&[("lib/foo.rb", "foo.rb")]);

    cmd()
        .current_dir(dir.path())
        .args(["-n", "-o", "spec", "lib/foo.rb"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "----- spec/foo_spec.rb -----\n# frozen_string_literal: true\n",
        ))
        .stdout(predicate::str::contains("created").not());

    assert!(!dir.path().join("spec").exists());
}

// -- rails mode --

#[test]
fn rails_controller_spec() {
    let dir = project(&[("app/controllers/admin/users_controller.rb", "users_controller.rb")]);

    cmd()
        .current_dir(dir.path())
        .args(["-r", "-o", "spec", "app/controllers/admin/users_controller.rb"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "spec/controllers/admin/users_controller_spec.rb created.",
        ));

    let spec = read(dir.path(), "spec/controllers/admin/users_controller_spec.rb");
    assert!(spec.starts_with("# frozen_string_literal: true\n\nrequire 'rails_helper'\n\n"));
    assert!(spec.contains("RSpec.describe Admin::UsersController, type: :controller do\n"));
    assert!(spec.contains("      get :index, params: {}\n"));
    assert!(spec.contains("      post :create, params: {}\n"));
    assert!(spec.contains("      patch :update, params: {}\n"));
    assert!(spec.contains("      get :export, params: {}\n"));
    assert!(!spec.contains("set_user"));
    assert!(!spec.contains("user_params"));
}

#[test]
fn rails_helper_spec() {
    let dir = project(&[("app/helpers/dates_helper.rb", "dates_helper.rb")]);

    cmd()
        .current_dir(dir.path())
        .args(["--rails", "-o", "spec", "app/helpers"])
        .assert()
        .success();

    let spec = read(dir.path(), "spec/helpers/dates_helper_spec.rb");
    assert!(spec.contains("RSpec.describe DatesHelper, type: :helper do\n"));
    assert!(spec.contains(
        "      date = double('date')\n      format = double('format')\n      result = format_date(date, format: format)\n"
    ));
    assert!(!spec.contains("described_class.new"));
}

#[test]
fn rails_model_spec() {
    let dir = project(&[("app/models/foo_model.rb", "foo_model.rb")]);

    cmd()
        .current_dir(dir.path())
        .args(["-r", "-o", "spec", "app/models/*.rb"])
        .assert()
        .success();

    let spec = read(dir.path(), "spec/models/foo_model_spec.rb");
    assert!(spec.contains("RSpec.describe FooModel, type: :model do\n"));
    assert!(spec.contains("  describe '.active' do\n"));
    assert!(spec.contains("      foo_model = described_class.new\n      result = foo_model.display_name\n"));
}

// -- custom templates --

#[test]
fn custom_full_template() {
    let dir = project(&[("lib/foo.rb", "foo.rb")]);
    fs::write(
        dir.path().join("full.tpl"),
        "# ${source_path}\nRSpec.describe ${class_name} do\n  subject(:${instance_name}) { described_class.new }\n${examples}end\n",
    )
    .unwrap();

    cmd()
        .current_dir(dir.path())
        .args(["--full-template", "full.tpl", "-o", "spec", "lib/foo.rb"])
        .assert()
        .success();

    let spec = read(dir.path(), "spec/foo_spec.rb");
    assert!(spec.starts_with("# lib/foo.rb\nRSpec.describe Foo do\n  subject(:foo) { described_class.new }\n  describe '#hello' do\n"));
}

#[test]
fn custom_template_with_unknown_variable_aborts_file() {
    let dir = project(&[("lib/foo.rb", "foo.rb")]);
    fs::write(dir.path().join("full.tpl"), "${nope}\n").unwrap();

    cmd()
        .current_dir(dir.path())
        .args(["--full-template", "full.tpl", "-o", "spec", "lib/foo.rb"])
        .assert()
        .success()
        .stderr(predicate::str::contains("undefined template variable: nope"));

    assert!(!dir.path().join("spec/foo_spec.rb").exists());
}

// -- per-file failures --

#[test]
fn files_without_class_are_skipped() {
    let dir = project(&[("bin/script.rb", "script.rb")]);

    cmd()
        .current_dir(dir.path())
        .args(["-o", "spec", "bin/script.rb"])
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "bin/script.rb skipped (Class/Module not found).",
        ));

    assert!(!dir.path().join("spec").exists());
}

#[test]
fn parse_failure_does_not_stop_other_files() {
    let dir = project(&[("lib/broken.rb", "broken.rb"), ("lib/foo.rb", "foo.rb")]);

    cmd()
        .current_dir(dir.path())
        .args(["-o", "spec", "lib/broken.rb", "lib/foo.rb"])
        .assert()
        .success()
        .stderr(predicate::str::contains("lib/broken.rb aborted - parse error at line 1"))
        .stdout(predicate::str::contains("spec/foo_spec.rb created."));

    assert!(!dir.path().join("spec/broken_spec.rb").exists());
}

// -- command line --

#[test]
fn invalid_exclusion_pattern_fails() {
    let dir = project(&[("lib/foo.rb", "foo.rb")]);

    cmd()
        .current_dir(dir.path())
        .args(["-x", "(", "lib/foo.rb"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid --exclude pattern"));
}

#[test]
fn requires_input_files() {
    cmd().assert().failure();
}

#[test]
fn unmatched_pattern_fails() {
    let dir = TempDir::new().unwrap();

    cmd()
        .current_dir(dir.path())
        .arg("lib/*.rb")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no files matched: lib/*.rb"))
        .stderr(predicate::str::contains("no Ruby source files found"));
}
