fn main() -> std::process::ExitCode {
    alfred_ssh_lib::run()
}
